//! The builtin commands.
//!
//! Builtins are plain functions collected into a map by [built_ins] and
//!     handed to [Runtime::new](crate::Runtime::new); nothing is
//!     registered behind the caller's back.
//! They live in the outermost binding frame and can be shadowed like any
//!     other name.
//!
//! Failures inside a builtin are raised untraced; the call dispatch in
//!     `exec` attaches the failing call's frame chain before the error
//!     propagates further.

use std::collections::HashMap;

use press_typeset::{Alignment, ColumnSpec, FragmentKind, PageSize};

use crate::ast::NodeId;
use crate::error::{Error, ErrorKind};
use crate::exec::ExecutionInput;
use crate::runtime::{BuiltIn, Value};

/// The standard builtin set.
pub fn built_ins() -> HashMap<&'static str, BuiltIn> {
    HashMap::from([
        ("size", BuiltIn::new("size", size)),
        ("font", BuiltIn::new("font", font)),
        ("indent", BuiltIn::new("indent", indent)),
        ("margin", BuiltIn::new("margin", margin)),
        ("output", BuiltIn::new("output", output)),
        ("line", BuiltIn::new("line", line)),
        ("get", BuiltIn::new("get", get)),
        ("columns", BuiltIn::new("columns", columns)),
        ("column", BuiltIn::new("column", column)),
        ("get_state", BuiltIn::new("get_state", get_state)),
        ("set_state", BuiltIn::new("set_state", set_state)),
        ("page_size", BuiltIn::new("page_size", page_size)),
        ("i", BuiltIn::new("i", italic)),
        ("tt", BuiltIn::new("tt", teletype)),
    ])
}

fn number_arg(args: &[Value], index: usize, func: &str) -> Result<f64, Error> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n as f64),
        Some(Value::Float(x)) => Ok(*x),
        Some(other) => Err(Error::message(format!(
            "`{func}` expects a number, got {}",
            other.type_name()
        ))),
        None => Err(Error::message(format!(
            "`{func}` is missing argument {}",
            index + 1
        ))),
    }
}

fn optional_number_arg(args: &[Value], index: usize, func: &str) -> Result<Option<f64>, Error> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => number_arg(args, index, func).map(Some),
    }
}

fn string_arg(args: &[Value], index: usize, func: &str) -> Result<String, Error> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(Error::message(format!(
            "`{func}` expects a string, got {}",
            other.type_name()
        ))),
        None => Err(Error::message(format!(
            "`{func}` is missing argument {}",
            index + 1
        ))),
    }
}

fn single_arg(mut args: Vec<Value>, func: &str) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::message(format!(
            "`{func}` expects exactly one argument, got {}",
            args.len()
        )));
    }
    Ok(args.remove(0))
}

/// `size(size, leading?)`: change the font size. The leading resets to
/// its default unless given explicitly.
fn size(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let size = number_arg(&args, 0, "size")?;
    let leading = optional_number_arg(&args, 1, "size")?;
    input.runtime.state.set_font_size(size, leading);
    Ok(Value::Null)
}

/// `font(name, size, leading?)`: change the font.
fn font(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let name = string_arg(&args, 0, "font")?;
    let size = number_arg(&args, 1, "font")?;
    let leading = optional_number_arg(&args, 2, "font")?;
    input.runtime.state.set_font(name, size, leading);
    Ok(Value::Null)
}

/// `indent(length)`: set the persistent left indent.
fn indent(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let length = number_arg(&args, 0, "indent")?;
    input.runtime.state.set_indent(length);
    Ok(Value::Null)
}

/// `margin(length)`: extra vertical space before the next fragment only.
fn margin(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let length = number_arg(&args, 0, "margin")?;
    input.runtime.state.set_margin(length);
    Ok(Value::Null)
}

/// Append a prepared value to the current output buffer.
///
/// Fragments are appended as they are; anything else becomes a text
/// fragment carrying the current state.
fn output_value(input: &mut ExecutionInput, value: Value) -> Result<Value, Error> {
    match value {
        Value::Fragments(fragments) => {
            for fragment in fragments {
                input.runtime.append_fragment(fragment);
            }
        }
        other => input.runtime.add_text(&other.to_string()),
    }
    Ok(Value::Null)
}

/// `output(value)`: emit a value into the surrounding template.
fn output(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let value = single_arg(args, "output")?;
    let value = input.prepare_value(value)?;
    output_value(input, value)
}

/// `line(value)`: emit a value as a full line of its own.
fn line(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let value = single_arg(args, "line")?;
    let value = input.prepare_value(value)?;
    match value {
        Value::Fragments(mut fragments) => {
            if fragments.len() > 1 {
                return Err(Error::untraced(ErrorKind::AmbiguousLineValue {
                    count: fragments.len(),
                }));
            }
            if let Some(mut fragment) = fragments.pop() {
                fragment.kind = FragmentKind::Line;
                input.runtime.append_fragment(fragment);
            }
            Ok(Value::Null)
        }
        other => {
            input.runtime.add_line(&other.to_string());
            Ok(Value::Null)
        }
    }
}

/// `get(name)`: read a binding from the scope stack.
fn get(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let name = string_arg(&args, 0, "get")?;
    match input.runtime.lookup(&name) {
        Some(value) => Ok(value.clone()),
        None => Err(Error::untraced(ErrorKind::UndefinedName { name })),
    }
}

/// `columns(specs)`: declare the column layout.
///
/// Each spec is an object; `width` (an integer) fixes a column's width
/// and `align: "right"` right-aligns it.
fn columns(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let Value::List(items) = single_arg(args, "columns")? else {
        return Err(Error::message("`columns` expects a list of objects"));
    };
    let mut specs = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(pairs) = item else {
            return Err(Error::message(format!(
                "`columns` expects a list of objects, got {} in the list",
                item.type_name()
            )));
        };
        let mut spec = ColumnSpec::default();
        for (key, value) in pairs {
            match (key.as_str(), value) {
                ("width", Value::Int(w)) => spec.width = Some(w),
                ("width", _) => {}
                ("align", Value::Str(s)) if s == "right" => spec.align = Alignment::Right,
                _ => {}
            }
        }
        specs.push(spec);
    }
    input.runtime.state.set_columns(specs);
    Ok(Value::Null)
}

/// `column(index)`: make the given 1-based column the active one.
fn column(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let index = number_arg(&args, 0, "column")? as i64;
    let declared = input.runtime.state.column_count();
    if index < 1 || index as usize > declared {
        return Err(Error::untraced(ErrorKind::UndeclaredColumn {
            index,
            declared,
        }));
    }
    input.runtime.state.set_column(index as usize);
    Ok(Value::Null)
}

/// `page_size(name)`: select a page size by name, e.g. `"A4"`.
fn page_size(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let name = string_arg(&args, 0, "page_size")?;
    match PageSize::parse(&name) {
        Some(size) => {
            input.runtime.state.set_page_size(size);
            Ok(Value::Null)
        }
        None => Err(Error::message(format!("unknown page size `{name}`"))),
    }
}

/// `get_state()`: a copy of the whole graphics state.
fn get_state(_: NodeId, input: &mut ExecutionInput, _: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::State(Box::new(input.runtime.state.clone())))
}

/// `set_state(state)`: install a previously copied graphics state.
fn set_state(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    match single_arg(args, "set_state")? {
        Value::State(state) => {
            input.runtime.state = *state;
            Ok(Value::Null)
        }
        other => Err(Error::message(format!(
            "`set_state` expects a state, got {}",
            other.type_name()
        ))),
    }
}

/// `i(value)`: emit a value in the italic variant of the current font.
fn italic(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let value = single_arg(args, "i")?;
    let saved = input.runtime.state.font.clone();
    input.runtime.state.font = format!("{saved}-Italic");
    let prepared = input.prepare_value(value)?;
    output_value(input, prepared)?;
    input.runtime.state.font = saved;
    Ok(Value::Null)
}

/// `tt(value)`: emit a value in a monospace font.
fn teletype(_: NodeId, input: &mut ExecutionInput, args: Vec<Value>) -> Result<Value, Error> {
    let value = single_arg(args, "tt")?;
    let saved = input.runtime.state.font.clone();
    let size = input.runtime.state.font_size;
    let leading = input.runtime.state.leading;
    input.runtime.state.set_font("Courier", size, Some(leading));
    let prepared = input.prepare_value(value)?;
    output_value(input, prepared)?;
    input.runtime.state.font = saved;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;
    use crate::error::Frame;
    use crate::runtime::Runtime;
    use press_typeset::Fragment;

    fn run_template(input: &str) -> Result<Vec<Fragment>, (Ast, Error)> {
        let mut ast = Ast::default();
        let source = ast.add_source("test.press", input, 0);
        let root = crate::parse::parse_template(&mut ast, source).expect("parse should succeed");
        ast.attach(root);
        let mut rt = Runtime::new(built_ins());
        let result = ExecutionInput::new(&ast, &mut rt).execute(root);
        match result {
            Ok(Value::Fragments(fragments)) => Ok(fragments),
            Ok(_) => panic!("template execution should return fragments"),
            Err(err) => Err((ast, err)),
        }
    }

    fn fragments(input: &str) -> Vec<Fragment> {
        run_template(input).expect("execution should succeed")
    }

    fn failure(input: &str) -> Error {
        run_template(input).expect_err("execution should fail").1
    }

    #[test]
    fn output_stringifies_plain_values() {
        let got = fragments("[output 1][output 1.5][output true][output null]");
        let texts: Vec<&str> = got.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "1.5", "true", "null"]);
    }

    #[test]
    fn output_emits_a_bound_string() {
        let got = fragments("[t = \"hi\"; output get \"t\"]");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "hi");
    }

    #[test]
    fn size_changes_the_following_fragments_only() {
        let got = fragments("a[size 20]b");
        assert_eq!(got[0].state.font_size, 12.0);
        assert_eq!(got[1].state.font_size, 20.0);
    }

    #[test]
    fn size_resets_leading_unless_given() {
        let got = fragments("[size(20, 1.5)]a[size 10]b");
        assert_eq!(got[0].state.leading, 1.5);
        assert_eq!(got[1].state.leading, 1.0);
    }

    #[test]
    fn font_switches_name_and_size() {
        let got = fragments("[font(\"Courier\", 9)]a");
        assert_eq!(got[0].state.font, "Courier");
        assert_eq!(got[0].state.font_size, 9.0);
    }

    #[test]
    fn margin_applies_to_one_fragment_only() {
        let got = fragments("[margin 18]a\nb[output \"c\"]");
        assert_eq!(got[0].state.margin, 18.0);
        assert_eq!(got[1].state.margin, 0.0);
    }

    #[test]
    fn line_emits_a_line_fragment() {
        let got = fragments("[line \"title\"]");
        assert_eq!(got[0].kind, FragmentKind::Line);
        assert_eq!(got[0].text, "title");
    }

    #[test]
    fn line_rejects_multiple_fragments() {
        // The template argument evaluates to a text run plus an inserted
        // fragment, which is one fragment too many for a single line.
        let err = failure("[line[a[output \"b\"]]]");
        assert!(matches!(
            err.kind,
            ErrorKind::AmbiguousLineValue { count: 2 }
        ));
    }

    #[test]
    fn line_retags_a_single_fragment() {
        let got = fragments("[line[a]]");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, FragmentKind::Line);
        assert_eq!(got[0].text, "a");
    }

    #[test]
    fn get_reads_header_bindings() {
        let got = fragments("[a = 1; output get \"a\"]");
        assert_eq!(got[0].text, "1");
    }

    #[test]
    fn get_of_an_unbound_name_fails() {
        let err = failure("[output get \"missing\"]");
        assert_eq!(
            err.kind,
            ErrorKind::UndefinedName {
                name: "missing".into()
            }
        );
        assert!(err.is_traced());
    }

    #[test]
    fn columns_declares_widths() {
        let got = fragments("[columns([{}, {width: 100}]); output \"x\"]");
        assert_eq!(got[0].state.column_count(), 2);
        assert_eq!(got[0].state.column_width(2), 100.0);
    }

    #[test]
    fn undeclared_column_selection_fails() {
        let err = failure("[columns([{}, {}]); column 3]");
        assert!(matches!(
            err.kind,
            ErrorKind::UndeclaredColumn {
                index: 3,
                declared: 2
            }
        ));
    }

    #[test]
    fn column_without_declaration_fails() {
        let err = failure("[column 1]");
        assert!(matches!(
            err.kind,
            ErrorKind::UndeclaredColumn {
                index: 1,
                declared: 0
            }
        ));
    }

    #[test]
    fn page_size_selects_by_name() {
        let got = fragments("[page_size \"Letter\"]x");
        assert_eq!(got[0].state.page_size, (612.0, 792.0));
        let err = failure("[page_size \"Tabloid\"]");
        assert!(matches!(err.kind, ErrorKind::BuiltinFailed { .. }));
    }

    #[test]
    fn state_round_trips_through_get_and_set() {
        let got = fragments("[s = get_state(); size 30; set_state get \"s\"; output \"x\"]");
        assert_eq!(got[0].state.font_size, 12.0);
    }

    #[test]
    fn italic_wraps_a_deferred_template() {
        let got = fragments("a [i[b]] c");
        assert_eq!(got[0].state.font, "Tahoma");
        assert_eq!(got[1].state.font, "Tahoma-Italic");
        assert_eq!(got[1].text, "b");
        assert_eq!(got[2].state.font, "Tahoma");
    }

    #[test]
    fn teletype_switches_to_courier_and_restores() {
        let got = fragments("a [tt[b]] c");
        assert_eq!(got[1].state.font, "Courier");
        assert_eq!(got[2].state.font, "Tahoma");
    }

    #[test]
    fn failure_inside_a_deferred_template_records_the_native_frame() {
        let err = failure("[i[x [nope] y]]");
        assert_eq!(
            err.kind,
            ErrorKind::UndefinedName {
                name: "nope".into()
            }
        );
        assert!(err
            .frames
            .iter()
            .any(|frame| matches!(frame, Frame::Host { .. })));
    }

    #[test]
    fn builtin_failures_are_traced_at_the_calling_node() {
        let (ast, err) = run_template("[size \"big\"]").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BuiltinFailed { .. }));
        let Frame::Script(node) = err.frames[0] else {
            panic!("expected a script frame");
        };
        let span = ast.node(node).span;
        assert_eq!(&"[size \"big\"]"[span.range()], "size \"big\"");
    }
}
