//! The `modules.console` extension: functions available at the prompt.

use std::path::PathBuf;
use std::rc::Rc;

use super::discovery::{self, ContribInfo};
use super::loader::ExtensionLoader;
use super::registry::{ExtensionKind, StaticExtension};
use crate::error::EvalError;
use crate::namespace::{CallArgs, Environment, Namespace, Native, Value};
use crate::session::SessionStore;
use crate::utils;

pub(crate) fn extensions() -> Vec<StaticExtension> {
    vec![StaticExtension::new(
        ExtensionKind::Modules,
        "console",
        "Session, extension and helper functions",
        console,
    )]
}

const NATIVES: &[Native] = &[
    Native {
        name: "save_session",
        doc: "Save the session to fname, conf.session or a new temp file",
        func: save_session,
    },
    Native {
        name: "load_session",
        doc: "Replace the session with the one stored in fname",
        func: load_session,
    },
    Native {
        name: "update_session",
        doc: "Merge the session stored in fname into the current one",
        func: update_session,
    },
    Native {
        name: "load_module",
        doc: "Load modules.<name> into the global namespace",
        func: load_module,
    },
    Native {
        name: "load_layer",
        doc: "Load layers.<name> into the global namespace",
        func: load_layer,
    },
    Native {
        name: "load_contrib",
        doc: "Load contrib.<name> into the global namespace",
        func: load_contrib,
    },
    Native {
        name: "list_contrib",
        doc: "List contrib scripts matching a pattern",
        func: list_contrib,
    },
    Native {
        name: "ls",
        doc: "List packet classes, or the fields of one class or packet",
        func: ls,
    },
    Native {
        name: "lsc",
        doc: "List available functions",
        func: lsc,
    },
    Native {
        name: "get_temp_file",
        doc: "Create a temporary file, removed at exit unless keep=True",
        func: get_temp_file,
    },
];

fn console() -> Namespace {
    NATIVES
        .iter()
        .map(|native| (native.name.to_string(), Value::Native(*native)))
        .collect()
}

fn session_path(env: &Environment, args: &CallArgs) -> Result<PathBuf, EvalError> {
    if let Some(fname) = args.opt_str(0, "fname")? {
        return Ok(PathBuf::from(fname));
    }
    env.conf()
        .borrow()
        .session
        .clone()
        .ok_or_else(|| EvalError::Runtime("no session file given and conf.session is unset".into()))
}

fn save_session(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    let path = match args.opt_str(0, "fname")? {
        Some(fname) => PathBuf::from(fname),
        None => {
            let current = env.conf().borrow().session.clone();
            match current {
                Some(path) => path,
                None => {
                    let path = utils::get_temp_file(env.conf(), true)
                        .map_err(|e| EvalError::Runtime(e.to_string()))?;
                    env.conf().borrow_mut().session = Some(path.clone());
                    tracing::info!(
                        target: "packet_console::interactive",
                        "Use [{}] as session file",
                        path.display()
                    );
                    path
                }
            }
        }
    };
    SessionStore::new().save(&path, env.session())?;
    Ok(Value::None)
}

fn load_session(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    let path = session_path(env, &args)?;
    let conf = Rc::clone(env.conf());
    SessionStore::new().restore_into(&path, env.session_mut(), &conf)?;
    Ok(Value::None)
}

fn update_session(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    let path = session_path(env, &args)?;
    let conf = Rc::clone(env.conf());
    SessionStore::new().update_into(&path, env.session_mut(), &conf)?;
    Ok(Value::None)
}

fn load_kind(env: &mut Environment, args: CallArgs, kind: ExtensionKind) -> Result<Value, EvalError> {
    let name = args.str(0, "name")?;
    Ok(Value::Bool(ExtensionLoader::new().load(env, kind, &name)))
}

fn load_module(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    load_kind(env, args, ExtensionKind::Modules)
}

fn load_layer(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    load_kind(env, args, ExtensionKind::Layers)
}

fn load_contrib(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    load_kind(env, args, ExtensionKind::Contrib)
}

/// Registered contrib extensions, then scripts in `conf.contrib_dir` not
/// already listed.
fn contrib_rows(env: &Environment, pattern: Option<&str>) -> Vec<ContribInfo> {
    let mut rows = env.registry().contrib_info(pattern);
    match env.conf().borrow().contrib_dir.clone() {
        Some(dir) => {
            for info in discovery::list_contrib(&dir, pattern) {
                if !rows.iter().any(|row| row.name == info.name) {
                    rows.push(info);
                }
            }
        }
        None => tracing::warn!(target: "packet_console::interactive", "conf.contrib_dir is not set"),
    }
    rows
}

fn list_contrib(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    let pattern = args.opt_str(0, "name")?;
    for row in contrib_rows(env, pattern.as_deref()) {
        println!("{}", row);
    }
    Ok(Value::None)
}

fn ls(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    match args.get(0, "obj") {
        None | Some(Value::None) => {
            for (name, value) in env.globals().iter() {
                if let Value::Class(class) = value {
                    println!("{:<10}: {}", name, class.field_names().join(", "));
                }
            }
        }
        Some(Value::Class(class)) => {
            for field in &class.fields_desc {
                println!("{:<10}: {}", field.name, field.default.to_value());
            }
        }
        Some(Value::Packet(p)) => {
            let layer = p.borrow();
            for field in &layer.class().fields_desc {
                let value = layer.get_field(&field.name).unwrap_or(Value::None);
                println!(
                    "{:<10}: {:<20} ({})",
                    field.name,
                    value.to_string(),
                    field.default.to_value()
                );
            }
        }
        Some(other) => {
            return Err(EvalError::Type(format!(
                "ls() expects a packet class or packet, not '{}'",
                other.type_name()
            )))
        }
    }
    Ok(Value::None)
}

fn lsc(env: &mut Environment, _args: CallArgs) -> Result<Value, EvalError> {
    for value in env.globals().iter().map(|(_, v)| v) {
        if let Value::Native(native) = value {
            println!("{:<16}: {}", native.name, native.doc);
        }
    }
    Ok(Value::None)
}

fn get_temp_file(env: &mut Environment, args: CallArgs) -> Result<Value, EvalError> {
    let keep = args.get(0, "keep").is_some_and(Value::is_truthy);
    let path = utils::get_temp_file(env.conf(), keep).map_err(|e| EvalError::Runtime(e.to_string()))?;
    Ok(Value::Str(path.display().to_string()))
}
