//! Command-line options.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Long flags accepted with a single dash for compatibility with the
/// documented interface (`-ast-dump`, ...).
const SINGLE_DASH_FLAGS: &[&str] = &[
    "-lexer-dump",
    "-ast-dump",
    "-import-dump",
    "-res-dump",
    "-cfg-dump",
    "-llvm-dump",
    "-print-stats",
    "-module",
    "-run",
    "-test",
    "-help",
];

/// Rewrites `-ast-dump` style flags into `--ast-dump` before clap sees
/// them.
pub fn normalize_args(args: impl Iterator<Item = OsString>) -> Vec<OsString> {
    args.map(|arg| {
        if let Some(text) = arg.to_str() {
            if SINGLE_DASH_FLAGS.contains(&text) {
                return OsString::from(format!("-{text}"));
            }
        }
        arg
    })
    .collect()
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "dmzc",
    about = "Compiler for the DMZ language",
    disable_version_flag = true
)]
pub struct Options {
    /// Include <dir> in the module search path.
    #[arg(short = 'I', value_name = "dir")]
    pub includes: Vec<PathBuf>,

    /// Write the executable (or object file) to <file>.
    #[arg(short = 'o', value_name = "file")]
    pub output: Option<PathBuf>,

    /// Print the lexer dump and exit.
    #[arg(long = "lexer-dump")]
    pub lexer_dump: bool,

    /// Print the abstract syntax tree and exit.
    #[arg(long = "ast-dump")]
    pub ast_dump: bool,

    /// Print the AST after module import and exit.
    #[arg(long = "import-dump")]
    pub import_dump: bool,

    /// Print the resolved syntax tree and exit.
    #[arg(long = "res-dump")]
    pub res_dump: bool,

    /// Print the control flow graphs and exit.
    #[arg(long = "cfg-dump")]
    pub cfg_dump: bool,

    /// Print the IR module and exit.
    #[arg(long = "llvm-dump")]
    pub llvm_dump: bool,

    /// Print phase timing statistics.
    #[arg(long = "print-stats")]
    pub print_stats: bool,

    /// Compile a module to an object file instead of an executable.
    #[arg(long = "module")]
    pub module: bool,

    /// Run the program with a JIT interpreter.
    #[arg(long = "run")]
    pub run: bool,

    /// Compile and run the tests.
    #[arg(long = "test")]
    pub test: bool,

    /// Source files (`.dmz`).
    #[arg(value_name = "source_files")]
    pub sources: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_dash_long_flags_normalize() {
        let args = normalize_args(
            ["dmzc", "-ast-dump", "-I", "lib", "main.dmz"]
                .into_iter()
                .map(OsString::from),
        );
        let options = Options::parse_from(args);
        assert!(options.ast_dump);
        assert_eq!(options.includes, vec![PathBuf::from("lib")]);
        assert_eq!(options.sources, vec![PathBuf::from("main.dmz")]);
    }

    #[test]
    fn run_and_output_flags() {
        let args = normalize_args(
            ["dmzc", "-run", "-o", "out", "a.dmz", "b.dmz"]
                .into_iter()
                .map(OsString::from),
        );
        let options = Options::parse_from(args);
        assert!(options.run);
        assert_eq!(options.output, Some(PathBuf::from("out")));
        assert_eq!(options.sources.len(), 2);
    }
}
