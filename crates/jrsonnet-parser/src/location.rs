//! Byte-offset -> (line, column) conversion for error rendering (spec §3,
//! §6.5). [`ExprLocation`] only carries byte offsets (cheap to stamp on
//! every node); recovering the 1-based line/column the spec's error text
//! wants means keeping the source text around. Rather than threading it
//! through every `LocError`, parsed files register their text here, keyed
//! by the same `Rc<Path>` every `ExprLocation` already carries.
use std::{cell::RefCell, collections::HashMap, path::Path, rc::Rc};

thread_local! {
	static SOURCES: RefCell<HashMap<Rc<Path>, Rc<str>>> = RefCell::new(HashMap::new());
}

/// Registers `source`'s text under `file`, so later [`line_col`] calls for
/// spans in that file can resolve without the caller holding the text.
pub fn register_source(file: &Rc<Path>, source: &str) {
	SOURCES.with(|s| s.borrow_mut().insert(file.clone(), Rc::from(source)));
}

/// 1-based `(line, column)` for a byte `offset` into `file`'s registered
/// source. Falls back to `(1, 1)` for synthetic file names that were never
/// registered (`<ext-code>`, `<stdlib>`, ...).
pub fn line_col(file: &Path, offset: usize) -> (usize, usize) {
	SOURCES.with(|s| {
		let sources = s.borrow();
		let Some(src) = sources.get(file) else {
			return (1, 1);
		};
		offset_to_line_col(src, offset)
	})
}

fn offset_to_line_col(src: &str, offset: usize) -> (usize, usize) {
	let mut line = 1;
	let mut col = 1;
	for (i, ch) in src.char_indices() {
		if i >= offset {
			break;
		}
		if ch == '\n' {
			line += 1;
			col = 1;
		} else {
			col += 1;
		}
	}
	(line, col)
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn first_line() {
		assert_eq!(offset_to_line_col("hello world", 6), (1, 7));
	}

	#[test]
	fn across_newlines() {
		assert_eq!(offset_to_line_col("abc\ndef\nghi", 8), (3, 1));
	}

	#[test]
	fn registered_round_trip() {
		let file: Rc<Path> = Rc::from(PathBuf::from("/a.jsonnet"));
		register_source(&file, "local x = 1;\nx + 1\n");
		assert_eq!(line_col(&file, 13), (2, 1));
	}
}
