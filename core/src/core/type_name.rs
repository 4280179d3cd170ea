// stepline/src/core/type_name.rs

//! Short, path-free type names for log fields, cached per type.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

static SHORT_NAMES: Lazy<RwLock<HashMap<TypeId, Arc<str>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// `my_app::orders::Checkout<alloc::string::String>` becomes `Checkout<String>`.
pub(crate) fn short_type_name<T: 'static + ?Sized>() -> Arc<str> {
  let id = TypeId::of::<T>();
  if let Some(name) = SHORT_NAMES.read().get(&id) {
    return name.clone();
  }
  SHORT_NAMES
    .write()
    .entry(id)
    .or_insert_with(|| Arc::from(strip_paths(std::any::type_name::<T>())))
    .clone()
}

/// Label for the pipeline `P` over context `T`: the context's short name, followed by
/// `/` and the marker's short name unless `P` is the default `()`.
pub(crate) fn pipeline_label<T: 'static, P: 'static>() -> String {
  if TypeId::of::<P>() == TypeId::of::<()>() {
    short_type_name::<T>().to_string()
  } else {
    format!("{}/{}", short_type_name::<T>(), short_type_name::<P>())
  }
}

fn strip_paths(full: &str) -> String {
  let mut out = String::with_capacity(full.len());
  let mut segment_start = 0;
  let mut chars = full.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      ':' if chars.peek() == Some(&':') => {
        chars.next();
        out.truncate(segment_start);
      }
      '<' | '>' | ',' | ';' | '[' | ']' | '(' | ')' | '&' | ' ' => {
        out.push(c);
        segment_start = out.len();
      }
      _ => out.push(c),
    }
  }
  out
}
