//! Evaluated declarations handed to the CSS emitter.

use std::fmt;

use sass_ir::Value;

/// One `property: value` produced inside a style rule.
#[derive(Clone, Debug, PartialEq)]
pub struct CssDeclaration {
    /// Selector of the enclosing rule; nested rules are joined with a space.
    pub selector: String,
    pub property: String,
    pub value: Value,
}

impl fmt::Display for CssDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ {}: {}; }}", self.selector, self.property, self.value)
    }
}
