use std::fmt;

use super::AsmInstruction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Text,
    Globl(String),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Text => write!(f, ".text"),
            Directive::Globl(name) => write!(f, ".globl {name}"),
        }
    }
}

/// Why the register cache inserted an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    Spill,
    Reload,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Spill => write!(f, "spill"),
            Note::Reload => write!(f, "reload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Directive(Directive),
    Label(String),
    Instr {
        instr: AsmInstruction,
        note: Option<Note>,
    },
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Directive(directive) => write!(f, "{directive}"),
            Line::Label(label) => write!(f, "{label}:"),
            Line::Instr { instr, note: None } => write!(f, "    {instr}"),
            Line::Instr {
                instr,
                note: Some(note),
            } => write!(f, "    {instr}  # {note}"),
        }
    }
}

/// A fully lowered function: directives, prologue, body and epilogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmFunction {
    pub name: String,
    /// Bytes reserved below the saved frame pointer.
    pub frame_size: u32,
    pub lines: Vec<Line>,
}

impl AsmFunction {
    /// Instructions only, in order, without directives or labels.
    pub fn instructions(&self) -> impl Iterator<Item = &AsmInstruction> {
        self.lines.iter().filter_map(|line| match line {
            Line::Instr { instr, .. } => Some(instr),
            Line::Directive(_) | Line::Label(_) => None,
        })
    }

    /// Number of instructions carrying `note`.
    #[must_use]
    pub fn count_notes(&self, note: Note) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, Line::Instr { note: Some(n), .. } if *n == note))
            .count()
    }
}

impl fmt::Display for AsmFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
