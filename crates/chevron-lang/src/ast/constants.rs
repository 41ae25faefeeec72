pub const ADD: &str = "add";
pub const DIV: &str = "div";
pub const MOD: &str = "mod";
pub const MUL: &str = "mul";
pub const NEG: &str = "neg";
pub const POW: &str = "pow";
pub const SUB: &str = "sub";
