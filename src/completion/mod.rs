//! Context-aware tab completion.
//!
//! Two modes are supported. Global mode matches names from the global
//! namespace, then from the session. Attribute mode resolves the dotted
//! prefix of `expr.attr` and matches the resolved object's members. Packets
//! and packet classes also offer their declared field names.
//!
//! Completion never fails: anything that cannot be resolved yields no
//! candidates.

mod helper;

use std::sync::LazyLock;

use regex::Regex;

pub use helper::ConsoleHelper;

use crate::namespace::{Environment, Namespace, Value};

/// Bookkeeping name never offered as a candidate.
pub const RESERVED_NAME: &str = "__builtins__";

static ATTR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+(?:\.\w+)*)\.(\w*)").expect("valid regex"));

/// What a token is completed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Plain names.
    Global,
    /// `expr.attr` member access.
    Attribute,
}

impl CompletionMode {
    /// Attribute mode for tokens containing a dot.
    pub fn for_token(token: &str) -> Self {
        if token.contains('.') {
            Self::Attribute
        } else {
            Self::Global
        }
    }
}

/// Produces completion candidates from the live namespaces.
#[derive(Debug, Clone, Copy)]
pub struct CompletionEngine<'a> {
    globals: &'a Namespace,
    session: &'a Namespace,
}

impl<'a> CompletionEngine<'a> {
    pub fn new(globals: &'a Namespace, session: &'a Namespace) -> Self {
        Self { globals, session }
    }

    pub fn for_env(env: &'a Environment) -> Self {
        Self::new(env.globals(), env.session().namespace())
    }

    /// Candidates for `token`, in natural order.
    pub fn complete(&self, token: &str, mode: CompletionMode) -> Vec<String> {
        match mode {
            CompletionMode::Global => self.global_matches(token),
            CompletionMode::Attribute => self.attr_matches(token),
        }
    }

    /// Complete the token ending at `pos` in `line`.
    ///
    /// Returns the byte offset where the token starts and the candidates
    /// that replace it.
    pub fn complete_line(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let (start, token) = extract_token(line, pos);
        (start, self.complete(token, CompletionMode::for_token(token)))
    }

    fn global_matches(&self, token: &str) -> Vec<String> {
        self.globals
            .keys()
            .chain(self.session.keys())
            .filter(|name| name.starts_with(token) && name.as_str() != RESERVED_NAME)
            .cloned()
            .collect()
    }

    fn attr_matches(&self, token: &str) -> Vec<String> {
        let Some(caps) = ATTR_TOKEN.captures(token) else {
            return Vec::new();
        };
        let (expr, attr) = (&caps[1], &caps[2]);

        let object = match self
            .globals
            .resolve_path(expr)
            .or_else(|_| self.session.resolve_path(expr))
        {
            Ok(object) => object,
            Err(e) => {
                tracing::trace!(expr, error = %e, "completion target not resolved");
                return Vec::new();
            }
        };

        candidate_words(&object)
            .into_iter()
            .filter(|word| word.starts_with(attr) && word != RESERVED_NAME)
            .map(|word| format!("{}.{}", expr, word))
            .collect()
    }
}

fn candidate_words(object: &Value) -> Vec<String> {
    match object.field_names() {
        Some(fields) => object
            .members()
            .into_iter()
            .filter(|m| !m.starts_with('_'))
            .chain(fields)
            .collect(),
        None => object
            .members()
            .into_iter()
            .chain(object.class_members())
            .collect(),
    }
}

/// The identifier-or-dotted-path token ending at byte offset `pos`.
pub fn extract_token(line: &str, pos: usize) -> (usize, &str) {
    let pos = pos.min(line.len());
    let Some(head) = line.get(..pos) else {
        return (pos, "");
    };
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos);
    (start, &head[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{FieldDesc, Packet, PacketClass};
    use std::rc::Rc;

    fn names(list: &[&str]) -> Namespace {
        list.iter()
            .map(|n| (n.to_string(), Value::None))
            .collect()
    }

    #[test]
    fn test_mode_for_token() {
        assert_eq!(CompletionMode::for_token("pk"), CompletionMode::Global);
        assert_eq!(CompletionMode::for_token("pkt."), CompletionMode::Attribute);
    }

    #[test]
    fn test_global_mode_skips_reserved() {
        let globals = names(&["__builtins__", "_x"]);
        let session = names(&[]);
        let engine = CompletionEngine::new(&globals, &session);
        assert_eq!(engine.complete("_", CompletionMode::Global), vec!["_x"]);
    }

    #[test]
    fn test_attribute_mode_on_class() {
        let class = Rc::new(PacketClass::new("UDP", vec![FieldDesc::int("sport", 53)]));
        let mut globals = Namespace::new();
        globals.insert("UDP", Value::Class(class));
        let session = Namespace::new();

        let engine = CompletionEngine::new(&globals, &session);
        assert_eq!(
            engine.complete("UDP.s", CompletionMode::Attribute),
            vec!["UDP.sport"]
        );
        let all = engine.complete("UDP.", CompletionMode::Attribute);
        assert!(all.contains(&"UDP.fields_desc".to_string()));
        assert!(!all.iter().any(|c| c.starts_with("UDP._")));
    }

    #[test]
    fn test_attribute_mode_on_nested_path() {
        let ip = Rc::new(PacketClass::new("IP", vec![FieldDesc::int("ttl", 64)]));
        let tcp = Rc::new(PacketClass::new("TCP", vec![FieldDesc::int("dport", 80)]));
        let pkt = Packet::build(&ip, vec![]).unwrap();
        pkt.borrow_mut()
            .set_payload(Some(Packet::build(&tcp, vec![]).unwrap()));

        let globals = Namespace::new();
        let mut session = Namespace::new();
        session.insert("pkt", Value::Packet(pkt));

        let engine = CompletionEngine::new(&globals, &session);
        assert_eq!(
            engine.complete("pkt.payload.dp", CompletionMode::Attribute),
            vec!["pkt.payload.dport"]
        );
    }

    #[test]
    fn test_attribute_mode_on_plain_value() {
        let globals = Namespace::new();
        let mut session = Namespace::new();
        session.insert("s", Value::from("text"));

        let engine = CompletionEngine::new(&globals, &session);
        assert_eq!(
            engine.complete("s.st", CompletionMode::Attribute),
            vec!["s.startswith", "s.strip"]
        );
    }

    #[test]
    fn test_unmatched_token() {
        let ns = Namespace::new();
        let engine = CompletionEngine::new(&ns, &ns);
        assert!(engine.complete(".x", CompletionMode::Attribute).is_empty());
        assert!(engine.complete("nope", CompletionMode::Attribute).is_empty());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("x = pkt.pay", 11), (4, "pkt.pay"));
        assert_eq!(extract_token("ls(IP", 5), (3, "IP"));
        assert_eq!(extract_token("a ", 2), (2, ""));
        assert_eq!(extract_token("", 0), (0, ""));
        assert_eq!(extract_token("abc", 99), (0, "abc"));
    }

    #[test]
    fn test_extract_token_inside_multibyte_char() {
        // byte 2 falls inside 'é'
        assert_eq!(extract_token("pé", 2), (2, ""));
        assert_eq!(extract_token("pé", 3), (0, "pé"));
    }

    #[test]
    fn test_complete_line() {
        let globals = names(&["send", "sniff"]);
        let session = names(&["sess1"]);
        let engine = CompletionEngine::new(&globals, &session);
        assert_eq!(
            engine.complete_line("p = se", 6),
            (4, vec!["send".to_string(), "sess1".to_string()])
        );
    }
}
