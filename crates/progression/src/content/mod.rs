mod compiler;
mod database;

pub use compiler::{
    compile_level, compile_level_file, ContentCompileError, ContentErrorCode, SourceLocation,
};
#[cfg(test)]
pub(crate) use database::LevelDefs;
pub use database::LevelDatabase;
