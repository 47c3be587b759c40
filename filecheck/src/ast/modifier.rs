use std::str::FromStr;

use crate::common::*;

#[derive(Debug)]
pub struct InvalidCheckModifierError;

bitflags::bitflags! {
    /// Represents modificatons to the behavior of a [Check]
    #[derive(Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CheckModifier: u8 {
        /// The pattern is matched verbatim, without placeholder recognition
        const LITERAL = 1;
        /// A failure to match is not an error
        const OPTIONAL = 1 << 1;
    }
}
impl Default for CheckModifier {
    fn default() -> Self {
        Self::empty()
    }
}
impl FromStr for CheckModifier {
    type Err = InvalidCheckModifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LITERAL" | "literal" => Ok(Self::LITERAL),
            "OPTIONAL" | "optional" => Ok(Self::OPTIONAL),
            _ => Err(InvalidCheckModifierError),
        }
    }
}
impl fmt::Debug for CheckModifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("CheckModifier(")?;
        if self.is_literal() {
            f.write_str("LITERAL")?;
        }
        if self.is_optional() {
            if self.is_literal() {
                f.write_str(" | ")?;
            }
            f.write_str("OPTIONAL")?;
        }
        f.write_str(")")
    }
}
impl CheckModifier {
    #[inline]
    pub fn is_literal(&self) -> bool {
        self.contains(Self::LITERAL)
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.contains(Self::OPTIONAL)
    }
}
