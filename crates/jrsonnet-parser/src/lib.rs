//! Jsonnet lexer, parser and surface AST.
//!
//! Source text is first tokenized by [`lexer`], then turned into a
//! [`LocExpr`] tree by [`parser`]. There is no separate grammar-definition
//! layer: the grammar lives directly in `parser.rs` as ordinary recursive
//! descent with precedence climbing for the binary operators.
use std::{
	fmt::{self, Display},
	path::Path,
	rc::Rc,
};

mod expr;
mod lexer;
pub mod location;
mod parser;

pub use expr::*;
pub use jrsonnet_interner::IStr;

/// Settings threaded through parsing.
pub struct ParserSettings {
	/// Whether to record [`ExprLocation`] on every node. Disabling this
	/// saves an allocation per node when error locations aren't needed
	/// (e.g. parsing trusted, pre-validated sources).
	pub loc_data: bool,
	pub file_name: Rc<Path>,
}

/// A lexing or parsing failure, tied to a single byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
	pub file_name: Rc<Path>,
	pub offset: usize,
	pub msg: String,
}

impl Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (line, col) = location::line_col(&self.file_name, self.offset);
		write!(f, "{}:{}:{}: {}", self.file_name.display(), line, col, self.msg)
	}
}
impl std::error::Error for ParseError {}

/// Parses a full Jsonnet source file into a located expression tree.
/// Registers `code` under `settings.file_name` so later error rendering
/// (spec §6.5) can recover line/column from the byte offsets stamped on
/// every [`ExprLocation`].
pub fn parse(code: &str, settings: &ParserSettings) -> Result<LocExpr, ParseError> {
	location::register_source(&settings.file_name, code);
	parser::parse(code, settings)
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	fn parse_expr(code: &str) -> LocExpr {
		parse(
			code,
			&ParserSettings {
				loc_data: true,
				file_name: PathBuf::from("/test.jsonnet").into(),
			},
		)
		.unwrap_or_else(|e| panic!("failed to parse {code:?}: {e}"))
	}

	fn parse_err(code: &str) -> ParseError {
		parse(
			code,
			&ParserSettings {
				loc_data: true,
				file_name: PathBuf::from("/test.jsonnet").into(),
			},
		)
		.expect_err("expected parse failure")
	}

	#[test]
	fn number_and_arith_precedence() {
		let e = parse_expr("2 + 2 * 2");
		assert_eq!(
			*e.0,
			Expr::BinaryOp(
				el!(Expr::Num(2.0)),
				BinaryOpType::Add,
				el!(Expr::BinaryOp(
					el!(Expr::Num(2.0)),
					BinaryOpType::Mul,
					el!(Expr::Num(2.0))
				))
			)
		);
	}

	#[test]
	fn double_negation() {
		let e = parse_expr("- -1");
		assert_eq!(
			*e.0,
			Expr::UnaryOp(
				UnaryOpType::Minus,
				el!(Expr::UnaryOp(UnaryOpType::Minus, el!(Expr::Num(1.0))))
			)
		);
	}

	#[test]
	fn string_literals_and_escaping() {
		let e = parse_expr(r#" "a\nb" "#);
		assert_eq!(*e.0, Expr::Str("a\nb".into()));
		let e = parse_expr("'it''s'".replace("''", "\\'").as_str());
		assert_eq!(*e.0, Expr::Str("it's".into()));
	}

	#[test]
	fn verbatim_string_doubled_quote() {
		let e = parse_expr(r#" @'it''s' "#);
		assert_eq!(*e.0, Expr::Str("it's".into()));
	}

	#[test]
	fn block_string() {
		let e = parse_expr("|||\n  hello\n  world\n|||");
		assert_eq!(*e.0, Expr::Str("hello\nworld\n".into()));
	}

	#[test]
	fn empty_object() {
		let e = parse_expr("{}");
		assert_eq!(*e.0, Expr::Obj(ObjBody::MemberList(Vec::new())));
	}

	#[test]
	fn object_field_and_hiddenness() {
		let e = parse_expr("{ a:: 1 }");
		match &*e.0 {
			Expr::Obj(ObjBody::MemberList(members)) => {
				assert_eq!(members.len(), 1);
				match &members[0] {
					Member::Field(f) => assert_eq!(f.visibility, Visibility::Hidden),
					_ => panic!("expected field"),
				}
			}
			_ => panic!("expected object"),
		}
	}

	#[test]
	fn array_comprehension() {
		let e = parse_expr("[x * 2 for x in arr]");
		match &*e.0 {
			Expr::ArrComp(_, specs) => assert_eq!(specs.len(), 1),
			_ => panic!("expected array comprehension"),
		}
	}

	#[test]
	fn imports() {
		assert!(matches!(&*parse_expr("import \"a.libsonnet\"").0, Expr::Import(p) if p.to_str() == Some("a.libsonnet")));
		assert!(
			matches!(&*parse_expr("importstr \"a.txt\"").0, Expr::ImportStr(p) if p.to_str() == Some("a.txt"))
		);
		assert!(
			matches!(&*parse_expr("importbin \"a.bin\"").0, Expr::ImportBin(p) if p.to_str() == Some("a.bin"))
		);
	}

	#[test]
	fn slices() {
		let e = parse_expr("arr[1:2:3]");
		assert!(matches!(&*e.0, Expr::Slice(_, desc) if desc.start.is_some() && desc.end.is_some() && desc.step.is_some()));
		let e = parse_expr("arr[::2]");
		assert!(matches!(&*e.0, Expr::Slice(_, desc) if desc.start.is_none() && desc.end.is_none() && desc.step.is_some()));
	}

	#[test]
	fn reserved_word_is_not_an_identifier() {
		parse_err("local = 1; local");
	}

	#[test]
	fn field_binding_tighter_than_binary_ops() {
		let e = parse_expr("a.b + c.d");
		assert!(matches!(&*e.0, Expr::BinaryOp(_, BinaryOpType::Add, _)));
	}

	#[test]
	fn location_info_is_recorded() {
		let e = parse_expr("1 + 1");
		assert!(e.1.is_some());
	}

	#[test]
	fn comments_are_skipped() {
		let e = parse_expr("1 + 1 // trailing comment\n");
		assert_eq!(
			*e.0,
			Expr::BinaryOp(el!(Expr::Num(1.0)), BinaryOpType::Add, el!(Expr::Num(1.0)))
		);
		let e = parse_expr("# hash comment\n1");
		assert_eq!(*e.0, Expr::Num(1.0));
		let e = parse_expr("/* block\ncomment */1");
		assert_eq!(*e.0, Expr::Num(1.0));
	}

	#[test]
	fn object_extension() {
		let e = parse_expr("{a: 1} {b: 2}");
		assert!(matches!(&*e.0, Expr::ObjExtend(_, _)));
	}

	#[test]
	fn function_with_default_param() {
		let e = parse_expr("function(x, y=2) x + y");
		match &*e.0 {
			Expr::Function(params, _) => {
				assert_eq!(params.len(), 2);
				assert!(params[0].1.is_none());
				assert!(params[1].1.is_some());
			}
			_ => panic!("expected function"),
		}
	}
}
