use anyhow::{Error as Failure, anyhow};
use clap::Parser;
use futures::channel::mpsc::unbounded;
use futures::{executor::block_on, future::ready, sink::unfold as sink};
use smother::uci::{Outbound, Uci, UciParser};
use smother::warn;
use std::io::{prelude::*, stdin, stdout};
use std::thread;

#[derive(Debug, Parser)]
#[clap(name = "Smother", version, author)]
#[clap(help_template = "
{name} v{version}

{name} is a UCI chess engine that proves or refutes forced checkmates.
It is released as free software under the terms of the GNU GPLv3 license.
")]
struct Cli {}

fn main() -> Result<(), Failure> {
    let _args = Cli::parse();

    let (tx, input) = unbounded();

    thread::spawn(move || {
        let mut lines = stdin().lock().lines();
        while let Some(Ok(line)) = lines.next() {
            match line.trim() {
                "" => continue,
                trimmed => match UciParser.parse(trimmed) {
                    Err(e) => warn!("ignored uci command, {e}"),
                    Ok(cmd) => match tx.unbounded_send(cmd) {
                        Ok(()) => continue,
                        Err(_) => break,
                    },
                },
            }
        }
    });

    let handle = thread::spawn(move || {
        let mut stdout = stdout().lock();
        let output = sink((), move |_, o: Outbound| ready(writeln!(stdout, "{o}")));
        Ok(block_on(Uci::new(input, output).run())?)
    });

    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("the uci thread panicked")),
    }
}
