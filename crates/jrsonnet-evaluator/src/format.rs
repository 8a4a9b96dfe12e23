//! The `%` string-format operator and `std.format` (spec §4.5/§4.7): a
//! printf subset (`d`, `o`, `x`/`X`, `e`/`E`, `f`/`F`, `g`/`G`, `c`, `s`,
//! `%`), supporting width/precision/flags and either a single value or an
//! array of positional values as the right-hand operand.
use jrsonnet_interner::IStr;

use crate::{
	error::{
		Error::{Format, RuntimeError},
		Result,
	},
	throw,
	val::Val,
};

/// Either a positional argument list (`std.format("%d %d", [1, 2])` / a bare
/// value treated as one positional argument) or a field lookup by name
/// (`std.format("%(x)d", {x: 1})`), per spec §4.6's `%(name)s` form.
enum FormatArgs {
	Positional(Vec<Val>),
	Named(crate::obj::ObjValue),
}

pub fn format_str(fmt: &str, args: &Val) -> Result<Val> {
	let args = match args {
		Val::Arr(items) => FormatArgs::Positional(items.iter().map(crate::val::Thunk::force).collect::<Result<Vec<_>>>()?),
		Val::Obj(o) => FormatArgs::Named(o.clone()),
		other => FormatArgs::Positional(vec![other.clone()]),
	};
	Ok(Val::Str(format_values(fmt, &args)?.into()))
}

struct Spec {
	name: Option<IStr>,
	flag_minus: bool,
	flag_zero: bool,
	flag_plus: bool,
	flag_space: bool,
	flag_hash: bool,
	width: Option<usize>,
	precision: Option<usize>,
	conv: char,
}

fn format_values(fmt: &str, args: &FormatArgs) -> Result<String> {
	let mut out = String::new();
	let mut chars = fmt.chars().peekable();
	let mut next_arg = 0;
	while let Some(c) = chars.next() {
		if c != '%' {
			out.push(c);
			continue;
		}
		if chars.peek() == Some(&'%') {
			chars.next();
			out.push('%');
			continue;
		}
		let spec = parse_spec(&mut chars)?;
		if spec.conv == '%' {
			out.push('%');
			continue;
		}
		let arg = match (&spec.name, args) {
			(Some(name), FormatArgs::Named(obj)) => obj
				.get(name.clone())?
				.ok_or_else(|| Format(format!("no such field: {name}")))?,
			(Some(_), FormatArgs::Positional(_)) => throw!(Format("%(name) used with non-object format argument".into())),
			(None, FormatArgs::Positional(values)) => {
				let v = values
					.get(next_arg)
					.ok_or_else(|| Format("not enough values for format string".into()))?
					.clone();
				next_arg += 1;
				v
			}
			(None, FormatArgs::Named(_)) => throw!(Format("format string uses positional arguments with an object".into())),
		};
		write_one(&mut out, &spec, &arg)?;
	}
	Ok(out)
}

fn parse_spec(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<Spec> {
	let mut spec = Spec {
		name: None,
		flag_minus: false,
		flag_zero: false,
		flag_plus: false,
		flag_space: false,
		flag_hash: false,
		width: None,
		precision: None,
		conv: '\0',
	};
	if chars.peek() == Some(&'(') {
		chars.next();
		let mut name = String::new();
		loop {
			match chars.next() {
				Some(')') => break,
				Some(c) => name.push(c),
				None => throw!(Format("unterminated %(name) in format string".into())),
			}
		}
		spec.name = Some(name.into());
	}
	loop {
		match chars.peek() {
			Some('-') => {
				spec.flag_minus = true;
				chars.next();
			}
			Some('0') => {
				spec.flag_zero = true;
				chars.next();
			}
			Some('+') => {
				spec.flag_plus = true;
				chars.next();
			}
			Some(' ') => {
				spec.flag_space = true;
				chars.next();
			}
			Some('#') => {
				spec.flag_hash = true;
				chars.next();
			}
			_ => break,
		}
	}
	spec.width = parse_number(chars);
	if chars.peek() == Some(&'.') {
		chars.next();
		spec.precision = Some(parse_number(chars).unwrap_or(0));
	}
	spec.conv = chars.next().ok_or_else(|| Format("unterminated format specifier".into()))?;
	Ok(spec)
}

fn parse_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<usize> {
	let mut s = String::new();
	while let Some(c) = chars.peek() {
		if c.is_ascii_digit() {
			s.push(*c);
			chars.next();
		} else {
			break;
		}
	}
	if s.is_empty() {
		None
	} else {
		s.parse().ok()
	}
}

fn write_one(out: &mut String, spec: &Spec, arg: &Val) -> Result<()> {
	let rendered = match spec.conv {
		'd' | 'i' => {
			let n = arg.as_num("%d argument")?;
			if n.fract() != 0.0 {
				throw!(RuntimeError(format!("field value {n} not an integer for %d/%i")));
			}
			render_sign(n, spec, format!("{}", n.trunc().abs() as i64))
		}
		'o' => {
			let n = arg.as_num("%o argument")? as i64;
			let body = format!("{:o}", n.unsigned_abs());
			render_sign(n as f64, spec, if spec.flag_hash { format!("0{body}") } else { body })
		}
		'x' => {
			let n = arg.as_num("%x argument")? as i64;
			let body = format!("{:x}", n.unsigned_abs());
			render_sign(n as f64, spec, if spec.flag_hash { format!("0x{body}") } else { body })
		}
		'X' => {
			let n = arg.as_num("%X argument")? as i64;
			let body = format!("{:X}", n.unsigned_abs());
			render_sign(n as f64, spec, if spec.flag_hash { format!("0X{body}") } else { body })
		}
		'e' | 'E' => {
			let n = arg.as_num("%e argument")?;
			let prec = spec.precision.unwrap_or(6);
			let body = format!("{:.*e}", prec, n.abs());
			let body = fixup_exponent(&body, spec.conv == 'E');
			render_sign(n, spec, body)
		}
		'f' | 'F' => {
			let n = arg.as_num("%f argument")?;
			let prec = spec.precision.unwrap_or(6);
			render_sign(n, spec, format!("{:.*}", prec, n.abs()))
		}
		'g' | 'G' => {
			let n = arg.as_num("%g argument")?;
			render_sign(n, spec, format_g(n.abs(), spec.precision.unwrap_or(6), spec.conv == 'G'))
		}
		'c' => {
			let n = arg.as_num("%c argument")?;
			let ch = char::from_u32(n as u32).ok_or_else(|| Format(format!("invalid codepoint: {n}")))?;
			ch.to_string()
		}
		's' => {
			let s = arg.to_display_string()?;
			match spec.precision {
				Some(p) => s.chars().take(p).collect(),
				None => s.to_string(),
			}
		}
		c => throw!(Format(format!("unknown format conversion: %{c}"))),
	};
	pad(out, spec, &rendered);
	Ok(())
}

fn render_sign(n: f64, spec: &Spec, body: String) -> String {
	if n.is_sign_negative() && n != 0.0 {
		format!("-{body}")
	} else if spec.flag_plus {
		format!("+{body}")
	} else if spec.flag_space {
		format!(" {body}")
	} else {
		body
	}
}

fn fixup_exponent(s: &str, upper: bool) -> String {
	let s = s.replace('e', if upper { "E" } else { "e" });
	if let Some(idx) = s.find(['e', 'E']) {
		let (mantissa, exp) = s.split_at(idx);
		let sign = &exp[..1];
		let digits = &exp[1..];
		let (sign, digits) = if sign == "e" || sign == "E" {
			("+", digits)
		} else {
			(sign, digits)
		};
		format!("{mantissa}{}{sign}{:0>2}", &s[idx..=idx], digits)
	} else {
		s
	}
}

fn format_g(n: f64, precision: usize, upper: bool) -> String {
	let precision = precision.max(1);
	let exp = if n == 0.0 { 0 } else { n.abs().log10().floor() as i32 };
	if exp < -4 || exp >= precision as i32 {
		fixup_exponent(&format!("{:.*e}", precision.saturating_sub(1), n), upper)
	} else {
		let decimals = (precision as i32 - 1 - exp).max(0) as usize;
		let s = format!("{n:.decimals$}");
		trim_trailing_zeros(&s)
	}
}

fn trim_trailing_zeros(s: &str) -> String {
	if !s.contains('.') {
		return s.to_string();
	}
	let trimmed = s.trim_end_matches('0');
	trimmed.trim_end_matches('.').to_string()
}

fn pad(out: &mut String, spec: &Spec, s: &str) {
	let Some(width) = spec.width else {
		out.push_str(s);
		return;
	};
	if s.chars().count() >= width {
		out.push_str(s);
		return;
	}
	let padding = width - s.chars().count();
	if spec.flag_minus {
		out.push_str(s);
		for _ in 0..padding {
			out.push(' ');
		}
	} else if spec.flag_zero && !spec.flag_minus {
		if let Some(stripped) = s.strip_prefix('-') {
			out.push('-');
			for _ in 0..padding {
				out.push('0');
			}
			out.push_str(stripped);
		} else {
			for _ in 0..padding {
				out.push('0');
			}
			out.push_str(s);
		}
	} else {
		for _ in 0..padding {
			out.push(' ');
		}
		out.push_str(s);
	}
}
