/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: Nodes, the closed node variant set and statement blocks
/// - expressions: Operators and expression payloads
/// - statements: Bindings, control flow and declarations
/// - types: Type tags, type expressions and modifiers
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
