mod checker;
mod context;
mod program;
mod rules;

pub use self::checker::Checker;
pub use self::context::MatchContext;
pub use self::program::{CheckProgram, CompiledDirective};
pub use self::rules::{CheckDag, CheckNext, CheckNot, CheckPlain, CheckSame, Rule};
