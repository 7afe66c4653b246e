//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// ccgo - extract C function signatures for binding generation
//

use clap::Parser;
use gettextrs::{bind_textdomain_codeset, gettext, setlocale, textdomain, LocaleCategory};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use posixutils_ccgo::diag;
use posixutils_ccgo::source;
use posixutils_ccgo::strings::StringTable;
use posixutils_ccgo::token::{show_token, TokenType};
use posixutils_ccgo::toolchain::Toolchain;
use posixutils_ccgo::{parse_functions, Config, Result};

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(
    version,
    about = gettext("ccgo - extract C function signatures for binding generation")
)]
struct Args {
    /// Input C source file
    file: String,

    /// Add include path
    #[arg(short = 'I', action = clap::ArgAction::Append, value_name = "dir",
          help = gettext("Add directory to the include search path"))]
    include_paths: Vec<String>,

    /// Define a macro (-D name or -D name=value)
    #[arg(short = 'D', action = clap::ArgAction::Append, value_name = "macro",
          help = gettext("Define a macro"))]
    defines: Vec<String>,

    /// Undefine a macro
    #[arg(short = 'U', action = clap::ArgAction::Append, value_name = "macro",
          help = gettext("Undefine a macro"))]
    undefines: Vec<String>,

    /// Do not search the default system include directories
    #[arg(long = "nostdinc", help = gettext("Do not search system include directories"))]
    no_std_inc: bool,

    /// Replace the allowed scalar parameter types
    #[arg(long = "allow-type", action = clap::ArgAction::Append, value_name = "type",
          help = gettext("Accept scalar parameters of this type (default: int64_t)"))]
    allowed_types: Vec<String>,

    /// Verbose output (include position info)
    #[arg(
        short = 'v',
        long = "verbose",
        help = gettext("Verbose output with position info")
    )]
    verbose: bool,

    /// Run preprocessor and dump result
    #[arg(short = 'E', help = gettext("Preprocess only, output to stdout"))]
    preprocess_only: bool,

    /// Compile to assembly after extraction
    #[arg(short = 'S', value_name = "file", help = gettext("Compile to assembly file"))]
    asm_output: Option<PathBuf>,

    /// Compile to an object after extraction
    #[arg(short = 'c', value_name = "file", help = gettext("Compile to object file"))]
    object_output: Option<PathBuf>,

    /// Disassemble the object written by -c
    #[arg(
        long = "disassemble",
        requires = "object_output",
        help = gettext("Disassemble the object file to stdout")
    )]
    disassemble: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::new();
        if self.no_std_inc {
            config = config.without_system_includes();
        }
        for dir in &self.include_paths {
            config = config.with_include_path(dir);
        }
        if !self.allowed_types.is_empty() {
            config = config.with_allowed_types(self.allowed_types.iter().cloned());
        }
        for def in &self.defines {
            config = config.with_define(def.as_str());
        }
        for name in &self.undefines {
            config = config.with_undef(name.as_str());
        }
        config
    }
}

/// -E: print the preprocessed token stream, keeping source line breaks
fn print_preprocessed(path: &str, config: &Config) -> Result<()> {
    let mut strings = StringTable::new();
    let (_, tokens) = source::preprocess_file(path, config, &mut strings)?;

    let mut out = String::new();
    for token in &tokens {
        if matches!(token.typ, TokenType::StreamBegin | TokenType::StreamEnd) {
            continue;
        }
        if token.pos.newline {
            if !out.is_empty() {
                out.push('\n');
            }
        } else if token.pos.whitespace {
            out.push(' ');
        }
        out.push_str(&show_token(token, &strings));
    }
    if !out.is_empty() {
        out.push('\n');
    }

    let _ = io::stdout().write_all(out.as_bytes());
    Ok(())
}

/// -S, -c and --disassemble stages, run only after extraction succeeded
fn run_toolchain(args: &Args, config: &Config) -> Result<()> {
    let toolchain = Toolchain::for_config(config);
    let source = Path::new(&args.file);

    if let Some(asm) = &args.asm_output {
        toolchain.compile_asm(source, asm)?;
    }

    if let Some(object) = &args.object_output {
        toolchain.compile_object(source, object)?;
        if args.disassemble {
            let dump = toolchain.disassemble(object)?;
            print!("{}", dump);
        }
    }

    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    setlocale(LocaleCategory::LcAll, "");
    textdomain("posixutils-rs")?;
    bind_textdomain_codeset("posixutils-rs", "UTF-8")?;

    env_logger::init();

    let args = Args::parse();
    let config = args.config();

    if args.preprocess_only {
        if let Err(e) = print_preprocessed(&args.file, &config) {
            diag::fatal(&e);
        }
        return Ok(());
    }

    let functions = match parse_functions(&args.file, &config) {
        Ok(functions) => functions,
        Err(e) => diag::fatal(&e),
    };

    let mut out = String::new();
    for func in &functions {
        if args.verbose {
            out.push_str(&format!("{}: {}\n", func.pos, func));
        } else {
            out.push_str(&format!("{}\n", func));
        }
    }
    io::stdout().write_all(out.as_bytes())?;

    if let Err(e) = run_toolchain(&args, &config) {
        diag::fatal(&e);
    }

    Ok(())
}
