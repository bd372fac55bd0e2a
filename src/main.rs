use clap::{crate_version, App, Arg, ErrorKind};
use log::{debug, LevelFilter};
use nexus::ast::AstPrinter;
use nexus::{parser, scanner, Interpreter, NexusError, Value};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use std::thread;

// sysexits.h
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_NOINPUT: i32 = 66;
const EX_SOFTWARE: i32 = 70;

// Deep context recursion needs more than the default main-thread stack.
const STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, Copy)]
struct Options {
    tokens: bool,
    ast: bool,
    bindings: bool,
}

fn main() {
    let app = App::new("nexus")
        .version(crate_version!())
        .about("Runs Nexus scripts, or an interactive prompt without one")
        .arg(Arg::with_name("SCRIPT").help("Script to run").index(1))
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("Print the token stream and exit"),
        )
        .arg(
            Arg::with_name("ast")
                .long("ast")
                .conflicts_with("tokens")
                .help("Print the syntax tree and exit"),
        )
        .arg(
            Arg::with_name("bindings")
                .long("bindings")
                .help("Print the top-level bindings after the run"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Log more; repeat for more detail"),
        );
    let matches = match app.get_matches_safe() {
        Ok(matches) => matches,
        Err(e) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                println!("{}", e.message);
                process::exit(0);
            }
            _ => {
                eprintln!("{}", e.message);
                process::exit(EX_USAGE);
            }
        },
    };

    let level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let options = Options {
        tokens: matches.is_present("tokens"),
        ast: matches.is_present("ast"),
        bindings: matches.is_present("bindings"),
    };
    let script = matches.value_of("SCRIPT").map(String::from);
    let child = thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(move || match script {
            Some(path) => run_file(&path, options),
            None => run_prompt(options),
        });
    let code = match child {
        Ok(child) => child.join().unwrap_or(EX_SOFTWARE),
        Err(e) => {
            eprintln!("nexus: {}", e);
            EX_SOFTWARE
        }
    };
    process::exit(code);
}

fn run_file(path: &str, options: Options) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("nexus: cannot read {}: {}", path, e);
            return EX_NOINPUT;
        }
    };
    let mut interpreter = Interpreter::new();
    match run(&mut interpreter, &source, options) {
        Ok(_) => {
            if options.bindings {
                print_bindings(&interpreter);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            exit_code(&e)
        }
    }
}

fn run_prompt(options: Options) -> i32 {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return EX_SOFTWARE;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => (),
            Err(e) => {
                eprintln!("nexus: {}", e);
                return EX_NOINPUT;
            }
        }
        match run(&mut interpreter, &line, options) {
            Ok(Value::Null) => (),
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("{}", e),
        }
    }
    if options.bindings {
        print_bindings(&interpreter);
    }
    0
}

fn run(interpreter: &mut Interpreter, source: &str, options: Options) -> Result<Value, NexusError> {
    let tokens = scanner::tokenize(source)?;
    if options.tokens {
        for token in &tokens {
            println!("{}:{} {:?} {}", token.line, token.column, token.tokentype, token.lexeme);
        }
        return Ok(Value::Null);
    }
    let program = parser::parse(&tokens)?;
    if options.ast {
        println!("{}", program.accept(&mut AstPrinter {}));
        return Ok(Value::Null);
    }
    let value = interpreter.interpret(&program)?;
    debug!("program yielded {}", value);
    Ok(value)
}

fn print_bindings(interpreter: &Interpreter) {
    for (name, value) in interpreter.globals() {
        println!("{} = {}", name, value);
    }
}

fn exit_code(error: &NexusError) -> i32 {
    match error {
        NexusError::Lex(_) | NexusError::Syntax(_) => EX_DATAERR,
        NexusError::Runtime(_) => EX_SOFTWARE,
    }
}
