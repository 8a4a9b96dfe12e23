//! The `jrsonnet` binary: a thin `clap`-derive translation from flags to
//! `jrsonnet_evaluator::Vm` configuration, plus one evaluate-and-manifest
//! call. All language semantics live in the library crates.
use std::{
	path::{Path, PathBuf},
	process::ExitCode,
	rc::Rc,
	str::FromStr,
};

use clap::{Parser, ValueEnum};
use jrsonnet_evaluator::{
	error::{Error::RuntimeError, LocError},
	import::FileImportResolver,
	throw,
	val::Val,
	Vm,
};
use jrsonnet_interner::IStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
	Json,
	Yaml,
	String,
}

/// One `--ext-str`/`--ext-code`/`--tla-str`/`--tla-code` occurrence: either
/// `NAME=VALUE`, or bare `NAME` to read the value from the environment.
#[derive(Clone)]
struct NameValue {
	name: String,
	value: String,
}

impl FromStr for NameValue {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split_once('=') {
			Some((name, value)) => Ok(Self {
				name: name.to_owned(),
				value: value.to_owned(),
			}),
			None => {
				let value = std::env::var(s).map_err(|_| format!("missing environment variable: {s}"))?;
				Ok(Self {
					name: s.to_owned(),
					value,
				})
			}
		}
	}
}

#[derive(Parser)]
#[command(version, author, about = "Rust jsonnet implementation")]
struct Opts {
	/// Add an external string variable (NAME=VALUE, or NAME to read $NAME)
	#[arg(long = "ext-str", value_name = "NAME[=VALUE]")]
	ext_str: Vec<NameValue>,
	/// Add an external variable bound to the evaluation of a Jsonnet expression
	#[arg(long = "ext-code", value_name = "NAME[=CODE]")]
	ext_code: Vec<NameValue>,
	/// Provide a string top-level argument
	#[arg(long = "tla-str", value_name = "NAME[=VALUE]")]
	tla_str: Vec<NameValue>,
	/// Provide a top-level argument bound to the evaluation of a Jsonnet expression
	#[arg(long = "tla-code", value_name = "NAME[=CODE]")]
	tla_code: Vec<NameValue>,

	/// Library search directory, searched in order after the importing file's own directory
	#[arg(long, short = 'J', value_name = "DIR")]
	jpath: Vec<PathBuf>,

	/// Output format, wraps the resulting value in the corresponding manifestation call
	#[arg(long, short = 'f', value_enum, default_value_t = Format::Json)]
	format: Format,
	/// Shorthand for --format string
	#[arg(short = 'S')]
	string: bool,
	/// Write a multi-file tree: the top-level value must be an object, each
	/// field manifested as its own file under this directory
	#[arg(long, short = 'm', value_name = "DIR")]
	multi: Option<PathBuf>,

	/// Number of allowed stack frames before reporting a stack overflow
	#[arg(long, short = 's', default_value_t = 500)]
	max_stack: usize,
	/// Max number of stack trace frames printed before the middle is elided
	#[arg(long, short = 't', default_value_t = 20)]
	max_trace: usize,

	/// File to evaluate
	input: PathBuf,
}

fn main() -> ExitCode {
	env_logger::init();
	let opts = Opts::parse();

	let vm = Vm::with_resolver(FileImportResolver {
		library_paths: opts.jpath.clone(),
	});
	vm.install_stdlib(jrsonnet_stdlib::stdlib());
	vm.set_max_stack(opts.max_stack);

	for NameValue { name, value } in &opts.ext_str {
		vm.add_ext_str(IStr::from(name.as_str()), IStr::from(value.as_str()));
	}
	for NameValue { name, value } in &opts.ext_code {
		vm.add_ext_code(IStr::from(name.as_str()), Rc::<str>::from(value.as_str()));
	}
	for NameValue { name, value } in &opts.tla_str {
		vm.add_tla_str(IStr::from(name.as_str()), IStr::from(value.as_str()));
	}
	for NameValue { name, value } in &opts.tla_code {
		vm.add_tla_code(IStr::from(name.as_str()), Rc::<str>::from(value.as_str()));
	}

	let format = if opts.string { Format::String } else { opts.format };

	let result = vm.evaluate_file(&opts.input).and_then(|val| render(&vm, val, format, opts.multi.as_deref()));

	match result {
		Ok(Rendered::Single(s)) => {
			print!("{s}");
			ExitCode::SUCCESS
		}
		Ok(Rendered::Multi) => ExitCode::SUCCESS,
		Err(err) => {
			print_error(&err, opts.max_trace);
			ExitCode::from(1)
		}
	}
}

/// Prints `err` the way `LocError`'s `Display` impl does, except that a
/// trace longer than `max_trace` frames has its middle elided rather than
/// printed in full.
fn print_error(err: &LocError, max_trace: usize) {
	if err.is_static() {
		eprintln!("STATIC ERROR: {}", err.error());
		return;
	}
	eprintln!("RUNTIME ERROR: {}", err.error());
	let frames: Vec<_> = err.trace().0.iter().rev().collect();
	if frames.len() <= max_trace {
		for frame in frames {
			print_frame(frame);
		}
		return;
	}
	let head = max_trace / 2;
	let tail = max_trace - head;
	for frame in &frames[..head] {
		print_frame(frame);
	}
	eprintln!("\t... ({} frame(s) elided) ...", frames.len() - head - tail);
	for frame in &frames[frames.len() - tail..] {
		print_frame(frame);
	}
}

fn print_frame(frame: &jrsonnet_evaluator::error::StackTraceElement) {
	let loc = frame.location.as_ref().map_or_else(|| "<unknown>".to_string(), render_location);
	eprintln!("\t{loc}\t{}", frame.desc);
}

fn render_location(loc: &jrsonnet_evaluator::ExprLocation) -> String {
	let (begin_line, begin_col) = jrsonnet_parser::location::line_col(&loc.0, loc.1);
	let (end_line, end_col) = jrsonnet_parser::location::line_col(&loc.0, loc.2);
	if begin_line == end_line {
		format!("{}:{begin_line}:{begin_col}-{end_col}", loc.0.display())
	} else {
		format!("{}:{begin_line}:{begin_col}-{end_line}:{end_col}", loc.0.display())
	}
}

enum Rendered {
	Single(String),
	Multi,
}

fn render(vm: &Vm, val: Val, format: Format, multi_dir: Option<&Path>) -> jrsonnet_evaluator::Result<Rendered> {
	if let Some(dir) = multi_dir {
		for (name, contents) in vm.manifest_multi(&val)? {
			let path = dir.join(name);
			if let Err(e) = std::fs::write(&path, contents) {
				throw!(RuntimeError(format!("couldn't write {}: {e}", path.display())));
			}
		}
		return Ok(Rendered::Multi);
	}
	let mut out = match format {
		Format::Json => vm.manifest_json(&val, 4)?,
		Format::Yaml => vm.manifest_yaml(&val)?,
		Format::String => val.as_str("top-level value, with --format string")?.to_string(),
	};
	out.push('\n');
	Ok(Rendered::Single(out))
}
