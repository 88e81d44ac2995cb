/*!
 * Command-line driver: parse each input file, print its diagnostics (and optionally the AST)
 */
#[macro_use]
extern crate log;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize,Ordering};
use std::thread;

use structopt::StructOpt;
use c51ast::{Config,Outcome,Status};

#[derive(StructOpt)]
#[structopt(name = "c51ast", about = "Parse C / 8051 source files into a syntax tree")]
struct Options
{
	#[structopt(parse(from_os_str), required = true)]
	inputs: Vec<PathBuf>,

	#[structopt(short = "I", parse(from_os_str), number_of_values = 1)]
	include_dirs: Vec<PathBuf>,

	/// `-D FOO=bar`
	#[structopt(short = "D", number_of_values = 1)]
	defines: Vec<String>,

	/// Print the syntax tree of each file
	#[structopt(long = "ast")]
	dump_ast: bool,

	/// Number of files processed at once (default: one per CPU)
	#[structopt(short = "j", long = "jobs")]
	jobs: Option<usize>,
}

fn main()
{
	env_logger::init();

	// 1. Parse command line arguments
	let args = Options::from_args();
	let config = Config {
		options: c51ast::preproc::Options {
			include_paths: args.include_dirs.clone(),
			passthrough: false,
			},
		defines: args.defines.iter().map(|d| c51ast::preproc::split_define_arg(d)).collect(),
		};
	let jobs = args.jobs
		.or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
		.unwrap_or(1)
		.max(1)
		.min(args.inputs.len());
	debug!("{} files, {} workers", args.inputs.len(), jobs);

	// 2. Process, then report in input order
	let mut failed = false;
	for (path, res) in args.inputs.iter().zip( process_all(&args.inputs, &config, jobs) )
	{
		match res
		{
		Err(e) => {
			eprintln!("{}: cannot read file: {}", path.display(), e);
			failed = true;
			},
		Ok(outcome) => {
			for d in &outcome.diagnostics
			{
				eprintln!("{}", d);
			}
			if args.dump_ast {
				println!("{:#?}", outcome.unit);
			}
			info!("{}: {:?}", path.display(), outcome.status);
			if outcome.status == Status::Failed {
				failed = true;
			}
			},
		}
	}
	if failed {
		::std::process::exit(1);
	}
}

/// Process every input on `jobs` worker threads (each file is independent, only `config` is shared)
fn process_all(inputs: &[PathBuf], config: &Config, jobs: usize) -> Vec<io::Result<Outcome>>
{
	let next = AtomicUsize::new(0);
	let mut results: Vec<(usize, io::Result<Outcome>)> = thread::scope(|s| {
		let workers: Vec<_> = (0 .. jobs).map(|_| s.spawn(|| {
			let mut done = Vec::new();
			loop
			{
				let i = next.fetch_add(1, Ordering::SeqCst);
				if i >= inputs.len() {
					break;
				}
				done.push( (i, c51ast::process_file(&inputs[i], config)) );
			}
			done
			})).collect();
		workers.into_iter()
			.flat_map(|w| w.join().unwrap_or_else(|e| ::std::panic::resume_unwind(e)))
			.collect()
		});
	results.sort_by_key(|r| r.0);
	results.into_iter().map(|r| r.1).collect()
}
