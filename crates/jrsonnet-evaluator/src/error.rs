//! Error types: [`Error`] is the closed set of things that can go wrong
//! during evaluation, [`LocError`] pairs one with the call-stack trace
//! accumulated while unwinding through [`crate::evaluate::evaluate`].
use std::{fmt, path::PathBuf, rc::Rc};

use jrsonnet_parser::{BinaryOpType, ExprLocation, UnaryOpType};
use thiserror::Error;

use crate::ValType;

#[derive(Error, Debug, Clone)]
pub enum Error {
	#[error("operator {0} does not operate on type {1}")]
	UnaryOperatorDoesNotOperateOnType(UnaryOpType, ValType),
	#[error("binary operation {1} {0} {2} is not implemented")]
	BinaryOperatorDoesNotOperateOnValues(BinaryOpType, ValType, ValType),

	#[error("self is only usable inside objects")]
	CantUseSelfOutsideOfObject,
	#[error("super is only usable inside objects")]
	CantUseSuperOutsideOfObject,
	#[error("$ does not refer to any object")]
	NoTopLevelObjectFound,

	#[error("for loop can only iterate over arrays")]
	InComprehensionCanOnlyIterateOverArray,

	#[error("array bounds error: {0} is not within [0,{1})")]
	ArrayBoundsError(usize, usize),

	#[error("{0}")]
	AssertionFailed(String),

	#[error("unknown variable: {0}")]
	VariableIsNotDefined(String),
	#[error("type mismatch: expected {}, got {2} {0}", .1.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))]
	TypeMismatch(&'static str, Vec<ValType>, ValType),
	#[error("field does not exist: {0}")]
	NoSuchField(String),

	#[error("only functions can be called, got {0}")]
	OnlyFunctionsCanBeCalledGot(ValType),
	#[error("function has no parameter {0}")]
	UnknownFunctionParameter(String),
	#[error("argument {0} is already bound")]
	BindingParameterASecondTime(String),
	#[error("too many args, function has {0} parameter(s)")]
	TooManyArgsFunctionHas(usize),
	#[error("Missing argument: {0}")]
	FunctionParameterNotBoundInCall(String),

	#[error("Undefined external variable: {0}")]
	UndefinedExternalVariable(String),
	#[error("native function is not registered: {0}")]
	UndefinedExternalFunction(String),
	#[error("top level object is not a function, can't pass top-level arguments")]
	TopLevelIsNotAFunction,

	#[error("field name should be a string, got {0}")]
	FieldMustBeStringGot(ValType),

	#[error("can't index a string with a string")]
	AttemptedIndexAnArrayWithString,
	#[error("{0} index type should be {1}, got {2}")]
	ValueIndexMustBeTypeGot(ValType, ValType, ValType),
	#[error("can't index into {0}")]
	CantIndexInto(ValType),

	#[error("can't resolve {1} from {0}")]
	ImportFileNotFound(PathBuf, PathBuf),
	#[error("couldn't open imported file {0}: {1}")]
	ResolvedFileNotFound(PathBuf, String),
	#[error("imported file is not valid utf-8: {0}")]
	ImportBadFileUtf8(PathBuf),

	#[error("{0}")]
	ImportSyntaxError(Box<jrsonnet_parser::ParseError>),
	#[error("{0}")]
	StaticError(String),

	#[error("runtime error: {0}")]
	RuntimeError(String),
	#[error("infinite recursion detected")]
	InfiniteRecursionDetected,
	#[error("max stack frames exceeded")]
	MaxStackFramesExceeded,
	#[error("tried to index by a fractional number")]
	FractionalIndex,
	#[error("attempted to divide by zero")]
	DivisionByZero,

	#[error("string manifest output is not a string")]
	StringManifestOutputIsNotAString,
	#[error("stream manifest output is not an array")]
	StreamManifestOutputIsNotAArray,
	#[error("multi manifest output is not an object of strings")]
	MultiManifestOutputIsNotAObject,

	#[error("couldn't manifest function")]
	CouldntManifestFunction,

	#[error("invalid unicode codepoint: {0}")]
	InvalidUnicodeCodepointGot(u32),
	#[error("{0}")]
	Format(String),

	#[error("{0}")]
	ImportCallbackError(String),
}

/// One frame of a runtime stack trace.
#[derive(Clone, Debug)]
pub struct StackTraceElement {
	pub location: Option<ExprLocation>,
	pub desc: String,
}

#[derive(Clone, Debug, Default)]
pub struct StackTrace(pub Vec<StackTraceElement>);

/// A [`crate::error::Error`] plus the stack trace accumulated while
/// propagating through nested `evaluate` calls. Static errors (lex/parse/
/// desugar) never grow a trace; runtime errors grow one frame per
/// enclosing function/object/top-level scope, outermost last.
#[derive(Clone, Debug)]
pub struct LocError(Rc<(Error, StackTrace)>);

impl LocError {
	pub fn new(e: Error) -> Self {
		Self(Rc::new((e, StackTrace::default())))
	}

	pub fn error(&self) -> &Error {
		&self.0 .0
	}

	pub fn trace(&self) -> &StackTrace {
		&self.0 .1
	}

	/// Appends one more frame, outermost-called-last (so the vec ends up
	/// innermost-first and is reversed before display).
	#[must_use]
	pub fn push_frame(self, location: Option<ExprLocation>, desc: String) -> Self {
		let (err, mut trace) = match Rc::try_unwrap(self.0) {
			Ok(inner) => inner,
			Err(rc) => (*rc).clone(),
		};
		trace.0.push(StackTraceElement { location, desc });
		Self(Rc::new((err, trace)))
	}

	pub fn is_static(&self) -> bool {
		matches!(self.0 .0, Error::StaticError(_) | Error::ImportSyntaxError(_))
	}
}

impl From<Error> for LocError {
	fn from(e: Error) -> Self {
		Self::new(e)
	}
}

/// Renders one frame's span as `<file>:<beginLine>:<beginCol>-<endCol>`
/// (spec §6.5). Cross-line spans (rare: multi-line object literals,
/// `|||` block strings) fall back to printing both endpoints in full
/// rather than the single-line `begin-end` column form, since the spec's
/// format has no separate notation for that case.
fn render_location(loc: &ExprLocation) -> String {
	let (begin_line, begin_col) = jrsonnet_parser::location::line_col(&loc.0, loc.1);
	let (end_line, end_col) = jrsonnet_parser::location::line_col(&loc.0, loc.2);
	if begin_line == end_line {
		format!("{}:{begin_line}:{begin_col}-{end_col}", loc.0.display())
	} else {
		format!("{}:{begin_line}:{begin_col}-{end_line}:{end_col}", loc.0.display())
	}
}

impl fmt::Display for LocError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_static() {
			write!(f, "STATIC ERROR: {}", self.error())?;
		} else {
			writeln!(f, "RUNTIME ERROR: {}", self.error())?;
			for (i, frame) in self.trace().0.iter().rev().enumerate() {
				if i != 0 {
					writeln!(f)?;
				}
				let loc = frame
					.location
					.as_ref()
					.map(render_location)
					.unwrap_or_else(|| "<unknown>".to_string());
				write!(f, "\t{}\t{}", loc, frame.desc)?;
			}
		}
		Ok(())
	}
}

pub type Result<V> = std::result::Result<V, LocError>;

#[macro_export]
macro_rules! throw {
	($e:expr) => {
		return Err($crate::error::LocError::from($e))
	};
}
