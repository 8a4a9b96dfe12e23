//! Recursive-descent parser with precedence climbing for binary operators.
//! Grounded in the same grammar as the reference `peg` grammar this crate
//! used to embed, just hand-written instead of generated: same rule names,
//! same precedence ladder, same surface-AST shape.
use std::{path::PathBuf, rc::Rc};

use jrsonnet_interner::IStr;

use crate::{
	lexer::{self, Token, TokenKind},
	ArgsDesc, AssertStmt, BinaryOpType, BindSpec, CompSpec, Expr, FieldMember, FieldName,
	ForSpecData, IfSpecData, LiteralType, LocExpr, Member, ObjBody, ObjComp, Param, ParamsDesc,
	ParseError, ParserSettings, SliceDesc, UnaryOpType, Visibility,
};

pub fn parse(src: &str, settings: &ParserSettings) -> Result<LocExpr, ParseError> {
	let tokens = lexer::lex(src, settings.file_name.clone())?;
	let mut parser = Parser {
		tokens,
		pos: 0,
		settings,
	};
	let e = parser.expr()?;
	parser.expect(TokenKind::Eof, "<end of file>")?;
	Ok(e)
}

struct Parser<'a> {
	tokens: Vec<Token>,
	pos: usize,
	settings: &'a ParserSettings,
}

impl<'a> Parser<'a> {
	fn cur(&self) -> &Token {
		&self.tokens[self.pos]
	}
	fn cur_kind(&self) -> TokenKind {
		self.cur().kind
	}
	fn bump(&mut self) -> Token {
		let t = self.tokens[self.pos].clone();
		if self.pos + 1 < self.tokens.len() {
			self.pos += 1;
		}
		t
	}
	fn at(&self, kind: TokenKind) -> bool {
		self.cur_kind() == kind
	}
	fn at_keyword(&self, kw: &str) -> bool {
		self.cur_kind() == TokenKind::Keyword && &*self.cur().text == kw
	}
	fn eat(&mut self, kind: TokenKind) -> bool {
		if self.at(kind) {
			self.bump();
			true
		} else {
			false
		}
	}
	fn eat_keyword(&mut self, kw: &str) -> bool {
		if self.at_keyword(kw) {
			self.bump();
			true
		} else {
			false
		}
	}
	fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
		if self.at(kind) {
			Ok(self.bump())
		} else {
			Err(self.err(format!(
				"expected {what}, got {:?} {:?}",
				self.cur().kind,
				self.cur().text
			)))
		}
	}
	fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
		if self.eat_keyword(kw) {
			Ok(())
		} else {
			Err(self.err(format!("expected keyword '{kw}'")))
		}
	}
	fn err(&self, msg: impl Into<String>) -> ParseError {
		ParseError {
			file_name: self.settings.file_name.clone(),
			offset: self.cur().start,
			msg: msg.into(),
		}
	}

	fn ident(&mut self) -> Result<IStr, ParseError> {
		let t = self.expect(TokenKind::Ident, "<identifier>")?;
		Ok(IStr::from(&*t.text))
	}

	fn loc(&self, start: usize, expr: Expr) -> LocExpr {
		let end = self.tokens[self.pos.saturating_sub(1)].end;
		loc_expr!(expr, self.settings.loc_data, (self.settings.file_name.clone(), start, end))
	}

	// ---- top-level expression, precedence climbing ----

	fn expr(&mut self) -> Result<LocExpr, ParseError> {
		self.or_expr()
	}

	fn or_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.and_expr()?;
		while self.eat(TokenKind::OrOr) {
			let rhs = self.and_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, BinaryOpType::Or, rhs));
		}
		Ok(lhs)
	}
	fn and_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.bitor_expr()?;
		while self.eat(TokenKind::AndAnd) {
			let rhs = self.bitor_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, BinaryOpType::And, rhs));
		}
		Ok(lhs)
	}
	fn bitor_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.bitxor_expr()?;
		while self.at(TokenKind::Pipe) {
			self.bump();
			let rhs = self.bitxor_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, BinaryOpType::BitOr, rhs));
		}
		Ok(lhs)
	}
	fn bitxor_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.bitand_expr()?;
		while self.eat(TokenKind::Caret) {
			let rhs = self.bitand_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, BinaryOpType::BitXor, rhs));
		}
		Ok(lhs)
	}
	fn bitand_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.eq_expr()?;
		while self.at(TokenKind::Amp) {
			self.bump();
			let rhs = self.eq_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, BinaryOpType::BitAnd, rhs));
		}
		Ok(lhs)
	}
	fn eq_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.rel_expr()?;
		loop {
			let op = if self.eat(TokenKind::Eq) {
				BinaryOpType::Eq
			} else if self.eat(TokenKind::Neq) {
				BinaryOpType::Neq
			} else {
				break;
			};
			let rhs = self.rel_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, op, rhs));
		}
		Ok(lhs)
	}
	fn rel_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.shift_expr()?;
		loop {
			let op = if self.eat(TokenKind::Lte) {
				BinaryOpType::Lte
			} else if self.eat(TokenKind::Gte) {
				BinaryOpType::Gte
			} else if self.eat(TokenKind::Lt) {
				BinaryOpType::Lt
			} else if self.eat(TokenKind::Gt) {
				BinaryOpType::Gt
			} else if self.eat_keyword("in") {
				BinaryOpType::In
			} else {
				break;
			};
			let rhs = self.shift_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, op, rhs));
		}
		Ok(lhs)
	}
	fn shift_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.add_expr()?;
		loop {
			let op = if self.eat(TokenKind::Shl) {
				BinaryOpType::Lhs
			} else if self.eat(TokenKind::Shr) {
				BinaryOpType::Rhs
			} else {
				break;
			};
			let rhs = self.add_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, op, rhs));
		}
		Ok(lhs)
	}
	fn add_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.mul_expr()?;
		loop {
			let op = if self.eat(TokenKind::Plus) {
				BinaryOpType::Add
			} else if self.eat(TokenKind::Minus) {
				BinaryOpType::Sub
			} else {
				break;
			};
			let rhs = self.mul_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, op, rhs));
		}
		Ok(lhs)
	}
	fn mul_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut lhs = self.unary_expr()?;
		loop {
			let op = if self.eat(TokenKind::Star) {
				BinaryOpType::Mul
			} else if self.eat(TokenKind::Slash) {
				BinaryOpType::Div
			} else if self.eat(TokenKind::Percent) {
				BinaryOpType::Mod
			} else {
				break;
			};
			let rhs = self.unary_expr()?;
			lhs = self.loc(start, Expr::BinaryOp(lhs, op, rhs));
		}
		Ok(lhs)
	}
	fn unary_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let op = if self.eat(TokenKind::Minus) {
			Some(UnaryOpType::Minus)
		} else if self.eat(TokenKind::Bang) {
			Some(UnaryOpType::Not)
		} else if self.eat(TokenKind::Tilde) {
			Some(UnaryOpType::BitNot)
		} else if self.eat(TokenKind::Plus) {
			Some(UnaryOpType::Plus)
		} else {
			None
		};
		if let Some(op) = op {
			let inner = self.unary_expr()?;
			return Ok(self.loc(start, Expr::UnaryOp(op, inner)));
		}
		self.postfix_expr()
	}

	// ---- postfix: index, slice, apply, object-extend ----

	fn postfix_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let mut e = self.primary_expr()?;
		loop {
			if self.eat(TokenKind::Dot) {
				let name = self.field_access_name()?;
				e = self.loc(start, Expr::Index(e, el!(Expr::Str(name))));
			} else if self.at(TokenKind::LeftBracket) {
				e = self.index_or_slice(start, e)?;
			} else if self.at(TokenKind::LeftParen) {
				self.bump();
				let args = self.args()?;
				self.expect(TokenKind::RightParen, "')'")?;
				let tailstrict = self.eat_keyword("tailstrict");
				e = self.loc(start, Expr::Apply(e, args, tailstrict));
			} else if self.at(TokenKind::LeftBrace) {
				let body = self.obj_inside()?;
				e = self.loc(start, Expr::ObjExtend(e, body));
			} else {
				break;
			}
		}
		Ok(e)
	}

	fn field_access_name(&mut self) -> Result<IStr, ParseError> {
		// Keywords are valid field names after a dot in some dialects; jsonnet
		// requires a plain identifier here.
		self.ident()
	}

	fn index_or_slice(&mut self, start: usize, target: LocExpr) -> Result<LocExpr, ParseError> {
		self.bump(); // '['
		if self.eat(TokenKind::Colon) {
			let (end_e, step) = self.slice_tail()?;
			self.expect(TokenKind::RightBracket, "']'")?;
			return Ok(self.loc(
				start,
				Expr::Slice(
					target,
					SliceDesc {
						start: None,
						end: end_e,
						step,
					},
				),
			));
		}
		let first = self.expr()?;
		if self.eat(TokenKind::Colon) {
			let (end_e, step) = self.slice_tail()?;
			self.expect(TokenKind::RightBracket, "']'")?;
			return Ok(self.loc(
				start,
				Expr::Slice(
					target,
					SliceDesc {
						start: Some(first),
						end: end_e,
						step,
					},
				),
			));
		}
		self.expect(TokenKind::RightBracket, "']'")?;
		Ok(self.loc(start, Expr::Index(target, first)))
	}

	/// After the first `:` of a slice: optional end, optional `:` + step.
	fn slice_tail(&mut self) -> Result<(Option<LocExpr>, Option<LocExpr>), ParseError> {
		let end_e = if self.at(TokenKind::Colon) || self.at(TokenKind::RightBracket) {
			None
		} else {
			Some(self.expr()?)
		};
		let step = if self.eat(TokenKind::Colon) {
			if self.at(TokenKind::RightBracket) {
				None
			} else {
				Some(self.expr()?)
			}
		} else {
			None
		};
		Ok((end_e, step))
	}

	// ---- primary ----

	fn primary_expr(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		match self.cur_kind() {
			TokenKind::Number => {
				let t = self.bump();
				Ok(self.loc(start, Expr::Num(t.num)))
			}
			TokenKind::Str => {
				let t = self.bump();
				Ok(self.loc(start, Expr::Str(IStr::from(&*t.text))))
			}
			TokenKind::LeftBracket => self.array_or_comp(),
			TokenKind::LeftBrace => {
				let body = self.obj_inside()?;
				Ok(self.loc(start, Expr::Obj(body)))
			}
			TokenKind::LeftParen => {
				self.bump();
				let e = self.expr()?;
				self.expect(TokenKind::RightParen, "')'")?;
				Ok(self.loc(start, Expr::Parened(e)))
			}
			TokenKind::Dollar => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::Dollar)))
			}
			TokenKind::Ident => {
				let t = self.bump();
				Ok(self.loc(start, Expr::Var(IStr::from(&*t.text))))
			}
			TokenKind::Keyword => self.keyword_primary(),
			_ => Err(self.err(format!(
				"unexpected token {:?} {:?}",
				self.cur().kind,
				self.cur().text
			))),
		}
	}

	fn keyword_primary(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		let kw: Rc<str> = self.cur().text.clone();
		match &*kw {
			"null" => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::Null)))
			}
			"true" => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::True)))
			}
			"false" => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::False)))
			}
			"self" => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::This)))
			}
			"super" => {
				self.bump();
				Ok(self.loc(start, Expr::Literal(LiteralType::Super)))
			}
			"import" => {
				self.bump();
				let path = self.string_literal()?;
				Ok(self.loc(start, Expr::Import(PathBuf::from(path))))
			}
			"importstr" => {
				self.bump();
				let path = self.string_literal()?;
				Ok(self.loc(start, Expr::ImportStr(PathBuf::from(path))))
			}
			"importbin" => {
				self.bump();
				let path = self.string_literal()?;
				Ok(self.loc(start, Expr::ImportBin(PathBuf::from(path))))
			}
			"local" => {
				self.bump();
				let binds = self.bind_list()?;
				self.expect(TokenKind::Semi, "';'")?;
				let rest = self.expr()?;
				Ok(self.loc(start, Expr::LocalExpr(binds, rest)))
			}
			"if" => {
				let cond = self.if_spec()?;
				self.expect_keyword("then")?;
				let cond_then = self.expr()?;
				let cond_else = if self.eat_keyword("else") {
					Some(self.expr()?)
				} else {
					None
				};
				Ok(self.loc(
					start,
					Expr::IfElse {
						cond,
						cond_then,
						cond_else,
					},
				))
			}
			"function" => {
				self.bump();
				self.expect(TokenKind::LeftParen, "'('")?;
				let params = self.params()?;
				self.expect(TokenKind::RightParen, "')'")?;
				let body = self.expr()?;
				Ok(self.loc(start, Expr::Function(params, body)))
			}
			"assert" => {
				let assertion = self.assertion()?;
				self.expect(TokenKind::Semi, "';'")?;
				let rest = self.expr()?;
				Ok(self.loc(start, Expr::AssertExpr(assertion, rest)))
			}
			"error" => {
				self.bump();
				let e = self.expr()?;
				Ok(self.loc(start, Expr::ErrorStmt(e)))
			}
			other => Err(self.err(format!("unexpected keyword '{other}' in expression"))),
		}
	}

	fn string_literal(&mut self) -> Result<String, ParseError> {
		let t = self.expect(TokenKind::Str, "<string>")?;
		Ok(t.text.to_string())
	}

	fn array_or_comp(&mut self) -> Result<LocExpr, ParseError> {
		let start = self.cur().start;
		self.bump(); // '['
		if self.eat(TokenKind::RightBracket) {
			return Ok(self.loc(start, Expr::Arr(Vec::new())));
		}
		let first = self.expr()?;
		if self.at(TokenKind::Comma) {
			// could still be `[e, for ...]` (trailing comma before for) or a plain array
			let save = self.pos;
			self.bump();
			if self.at_keyword("for") {
				let specs = self.comp_specs()?;
				self.expect(TokenKind::RightBracket, "']'")?;
				return Ok(self.loc(start, Expr::ArrComp(first, specs)));
			}
			self.pos = save;
		}
		if self.at_keyword("for") {
			let specs = self.comp_specs()?;
			self.expect(TokenKind::RightBracket, "']'")?;
			return Ok(self.loc(start, Expr::ArrComp(first, specs)));
		}
		let mut items = vec![first];
		while self.eat(TokenKind::Comma) {
			if self.at(TokenKind::RightBracket) {
				break;
			}
			items.push(self.expr()?);
		}
		self.expect(TokenKind::RightBracket, "']'")?;
		Ok(self.loc(start, Expr::Arr(items)))
	}

	fn comp_specs(&mut self) -> Result<Vec<CompSpec>, ParseError> {
		let mut out = vec![CompSpec::ForSpec(self.for_spec()?)];
		loop {
			if self.at_keyword("for") {
				out.push(CompSpec::ForSpec(self.for_spec()?));
			} else if self.at_keyword("if") {
				out.push(CompSpec::IfSpec(self.if_spec()?));
			} else {
				break;
			}
		}
		Ok(out)
	}

	fn for_spec(&mut self) -> Result<ForSpecData, ParseError> {
		self.expect_keyword("for")?;
		let name = self.ident()?;
		self.expect_keyword("in")?;
		let e = self.expr()?;
		Ok(ForSpecData(name, e))
	}
	fn if_spec(&mut self) -> Result<IfSpecData, ParseError> {
		self.expect_keyword("if")?;
		Ok(IfSpecData(self.expr()?))
	}

	fn params(&mut self) -> Result<ParamsDesc, ParseError> {
		let mut params = Vec::new();
		if !self.at(TokenKind::RightParen) {
			loop {
				let name = self.ident()?;
				let default = if self.eat(TokenKind::Assign) {
					Some(self.expr()?)
				} else {
					None
				};
				params.push(Param(name, default));
				if !self.eat(TokenKind::Comma) {
					break;
				}
				if self.at(TokenKind::RightParen) {
					break;
				}
			}
		}
		let mut seen_default = false;
		for p in &params {
			if p.1.is_some() {
				seen_default = true;
			} else if seen_default {
				return Err(self.err("positional parameter after a defaulted parameter"));
			}
		}
		Ok(ParamsDesc(Rc::new(params)))
	}

	fn args(&mut self) -> Result<ArgsDesc, ParseError> {
		let mut unnamed = Vec::new();
		let mut named = Vec::new();
		if !self.at(TokenKind::RightParen) {
			loop {
				if self.at(TokenKind::Ident) && self.peek_is_assign_after_ident() {
					let name = self.ident()?;
					self.expect(TokenKind::Assign, "'='")?;
					let v = self.expr()?;
					named.push((name, v));
				} else {
					if !named.is_empty() {
						return Err(self.err("positional argument after a named argument"));
					}
					unnamed.push(self.expr()?);
				}
				if !self.eat(TokenKind::Comma) {
					break;
				}
				if self.at(TokenKind::RightParen) {
					break;
				}
			}
		}
		Ok(ArgsDesc::new(unnamed, named))
	}

	fn peek_is_assign_after_ident(&self) -> bool {
		self.tokens
			.get(self.pos + 1)
			.map(|t| t.kind == TokenKind::Assign)
			.unwrap_or(false)
	}

	fn bind(&mut self) -> Result<BindSpec, ParseError> {
		let name = self.ident()?;
		if self.eat(TokenKind::LeftParen) {
			let params = self.params()?;
			self.expect(TokenKind::RightParen, "')'")?;
			self.expect(TokenKind::Assign, "'='")?;
			let value = self.expr()?;
			Ok(BindSpec {
				name,
				params: Some(params),
				value,
			})
		} else {
			self.expect(TokenKind::Assign, "'='")?;
			let value = self.expr()?;
			Ok(BindSpec {
				name,
				params: None,
				value,
			})
		}
	}

	fn bind_list(&mut self) -> Result<Vec<BindSpec>, ParseError> {
		let mut out = vec![self.bind()?];
		while self.eat(TokenKind::Comma) {
			out.push(self.bind()?);
		}
		Ok(out)
	}

	fn assertion(&mut self) -> Result<AssertStmt, ParseError> {
		self.expect_keyword("assert")?;
		let cond = self.expr()?;
		let msg = if self.eat(TokenKind::Colon) {
			Some(self.expr()?)
		} else {
			None
		};
		Ok(AssertStmt(cond, msg))
	}

	// ---- objects ----

	fn field_name(&mut self) -> Result<FieldName, ParseError> {
		match self.cur_kind() {
			TokenKind::Ident | TokenKind::Keyword => {
				let t = self.bump();
				Ok(FieldName::Fixed(IStr::from(&*t.text)))
			}
			TokenKind::Str => {
				let t = self.bump();
				Ok(FieldName::Fixed(IStr::from(&*t.text)))
			}
			TokenKind::LeftBracket => {
				self.bump();
				let e = self.expr()?;
				self.expect(TokenKind::RightBracket, "']'")?;
				Ok(FieldName::Dyn(e))
			}
			_ => Err(self.err("expected field name")),
		}
	}

	fn visibility(&mut self) -> Result<Visibility, ParseError> {
		if self.eat(TokenKind::TripleColon) {
			Ok(Visibility::Unhide)
		} else if self.eat(TokenKind::DoubleColon) {
			Ok(Visibility::Hidden)
		} else if self.eat(TokenKind::Colon) {
			Ok(Visibility::Normal)
		} else {
			Err(self.err("expected ':', '::' or ':::'"))
		}
	}

	fn field(&mut self) -> Result<FieldMember, ParseError> {
		let name = self.field_name()?;
		if self.eat(TokenKind::LeftParen) {
			let params = self.params()?;
			self.expect(TokenKind::RightParen, "')'")?;
			let visibility = self.visibility()?;
			let value = self.expr()?;
			return Ok(FieldMember {
				name,
				plus: false,
				params: Some(params),
				visibility,
				value,
			});
		}
		let plus = self.eat(TokenKind::Plus);
		let visibility = self.visibility()?;
		let value = self.expr()?;
		Ok(FieldMember {
			name,
			plus,
			params: None,
			visibility,
			value,
		})
	}

	fn obj_local(&mut self) -> Result<BindSpec, ParseError> {
		self.expect_keyword("local")?;
		self.bind()
	}

	fn member(&mut self) -> Result<Member, ParseError> {
		if self.at_keyword("local") {
			Ok(Member::BindStmt(self.obj_local()?))
		} else if self.at_keyword("assert") {
			Ok(Member::AssertStmt(self.assertion()?))
		} else {
			Ok(Member::Field(self.field()?))
		}
	}

	fn obj_inside(&mut self) -> Result<ObjBody, ParseError> {
		self.expect(TokenKind::LeftBrace, "'{'")?;
		if self.eat(TokenKind::RightBrace) {
			return Ok(ObjBody::MemberList(Vec::new()));
		}

		let save = self.pos;
		if let Some(comp) = self.try_obj_comp() {
			return Ok(ObjBody::ObjComp(comp));
		}
		self.pos = save;

		let mut members = vec![self.member()?];
		while self.eat(TokenKind::Comma) {
			if self.at(TokenKind::RightBrace) {
				break;
			}
			members.push(self.member()?);
		}
		self.expect(TokenKind::RightBrace, "'}'")?;
		Ok(ObjBody::MemberList(members))
	}

	/// Attempts to parse an object comprehension: `local`* then `[key]` then
	/// `:`/`+:` then `value`, `local`* then `for`/`if` specs. Returns `None`
	/// (without guaranteeing the cursor position) on any mismatch; callers
	/// must restore `self.pos` themselves before falling back.
	fn try_obj_comp(&mut self) -> Option<ObjComp> {
		let mut pre_locals = Vec::new();
		while self.at_keyword("local") {
			pre_locals.push(self.obj_local().ok()?);
			if !self.eat(TokenKind::Comma) {
				break;
			}
		}
		if !self.eat(TokenKind::LeftBracket) {
			return None;
		}
		let key = self.expr().ok()?;
		if !self.eat(TokenKind::RightBracket) {
			return None;
		}
		let plus = self.eat(TokenKind::Plus);
		if !self.eat(TokenKind::Colon) {
			return None;
		}
		let value = self.expr().ok()?;
		let mut post_locals = Vec::new();
		while self.eat(TokenKind::Comma) {
			if self.at_keyword("local") {
				post_locals.push(self.obj_local().ok()?);
			} else {
				return None;
			}
		}
		if !self.at_keyword("for") {
			return None;
		}
		let compspecs = self.comp_specs().ok()?;
		self.expect(TokenKind::RightBrace, "'}'").ok()?;
		Some(ObjComp {
			pre_locals,
			key,
			plus,
			value,
			post_locals,
			compspecs,
		})
	}
}
