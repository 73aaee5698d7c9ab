pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
pub const INPUT_ERROR: i32 = 2;
/// The data source could not be opened
pub const SOURCE_ERROR: i32 = 3;
