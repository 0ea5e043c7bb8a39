use std::env;
use std::io::{self, BufRead};
use std::process;

use rjitcc::{compile, emit_assembly};

fn main() {
  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("rjitcc");

  let (emit_asm, rest) = match args.get(1).map(String::as_str) {
    Some("--emit-asm") => (true, &args[2..]),
    _ => (false, &args[1..]),
  };

  let Some(expr) = rest.first() else {
    eprintln!("usage: {program} [--emit-asm] <expr> [value...]");
    process::exit(1);
  };

  if emit_asm {
    match emit_assembly(expr) {
      Ok(asm) => print!("{asm}"),
      Err(err) => {
        eprintln!("{err}");
        process::exit(1);
      }
    }
    return;
  }

  let func = match compile(expr) {
    Ok(func) => func,
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  };

  let values = &rest[1..];
  if values.is_empty() {
    // No values on the command line: evaluate once per integer on stdin,
    // as many per line as the caller likes.
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
      let line = match line {
        Ok(line) => line,
        Err(err) => {
          eprintln!("{program}: {err}");
          process::exit(1);
        }
      };
      for word in line.split_whitespace() {
        evaluate(program, &func, word);
      }
    }
  } else {
    for raw in values {
      evaluate(program, &func, raw);
    }
  }
}

fn evaluate(program: &str, func: &rjitcc::CompiledFunction, raw: &str) {
  match raw.parse::<i64>() {
    Ok(value) => println!("{}", func.call(value)),
    Err(err) => {
      eprintln!("{program}: invalid input '{raw}': {err}");
      process::exit(1);
    }
  }
}
