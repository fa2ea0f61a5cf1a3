/// How compound statements interact with the symbol table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scoping {
    /// One table per function; nested blocks share it, so a redeclaration in a
    /// sibling block rebinds the same name.
    #[default]
    Flat,
    /// Each compound statement opens a child table chained to the enclosing one.
    Block,
}

/// Options controlling a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub scoping: Scoping,
    /// Tag spill and reload instructions with `# spill` / `# reload` comments.
    pub annotate: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            scoping: Scoping::Flat,
            annotate: true,
        }
    }
}
