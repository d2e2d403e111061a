//! Demo host for running PanSpark scripts from the command line. This is
//! a development tool standing in for a full embedding host, not the
//! tick-driver contract a production integration would implement.

#[macro_use]
extern crate clap;

use clap::Arg;
use panspark::{Limits, Outcome, StepMode, Vm};
use std::fs;
use std::path::Path;
use std::process;

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Vm(panspark::Error),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("panspark-cli: {:?}", err);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("PROGRAM")
                .help("Sets the PanSpark source file to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("registers")
                .short("r")
                .long("registers")
                .takes_value(true)
                .value_name("COUNT")
                .default_value("32")
                .help("Sets the register count"),
        )
        .arg(
            Arg::with_name("call-stack")
                .short("c")
                .long("call-stack")
                .takes_value(true)
                .value_name("DEPTH")
                .default_value("64")
                .help("Sets the call-stack depth limit"),
        )
        .arg(
            Arg::with_name("heap")
                .short("m")
                .long("heap")
                .takes_value(true)
                .value_name("BYTES")
                .default_value("4096")
                .help("Sets the heap byte budget"),
        )
        .arg(
            Arg::with_name("fast")
                .short("f")
                .long("fast")
                .help("Runs in fast mode, chaining steps without suspending between them"),
        )
        .arg(
            Arg::with_name("dump-registers")
                .short("d")
                .long("dump-registers")
                .help("Prints the final register file after the program completes"),
        )
        .get_matches();

    let register_count = value_t!(matches.value_of("registers"), usize).unwrap_or_else(|e| e.exit());
    let call_stack_limit = value_t!(matches.value_of("call-stack"), usize).unwrap_or_else(|e| e.exit());
    let heap_limit = value_t!(matches.value_of("heap"), usize).unwrap_or_else(|e| e.exit());

    let program_path = matches.value_of("PROGRAM").expect("required argument");
    let source = fs::read_to_string(Path::new(program_path)).map_err(Error::Io)?;

    let limits = Limits::new(register_count, call_stack_limit, heap_limit);
    let mut vm = Vm::new(limits);
    vm.compile(&source).map_err(Error::Vm)?;

    if matches.is_present("fast") {
        vm.set_mode(StepMode::Fast);
    }

    loop {
        match vm.step().map_err(Error::Vm)? {
            Outcome::Completed => break,
            Outcome::Suspended => continue,
        }
    }

    for value in vm.output() {
        println!("{}", value);
    }

    if matches.is_present("dump-registers") {
        println!("-- registers --");
        for (index, value) in vm.registers().cells().iter().enumerate() {
            println!("r{} = {:?}", index, value);
        }
    }

    Ok(())
}
