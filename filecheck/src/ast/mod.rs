mod directive;
mod file;
mod modifier;
mod pattern;

pub use self::directive::{Check, CheckType, InvalidCheckTypeError};
pub use self::file::{CheckFile, CheckLine, CheckSection};
pub use self::modifier::{CheckModifier, InvalidCheckModifierError};
pub use self::pattern::{CheckPattern, CheckPatternPart};
