//! The shell runtime: a Rhai engine wired to one [`ShellContext`].
//!
//! Globals available to scripts:
//!
//! | Name | Value |
//! |------|-------|
//! | `db` | a `Database` handle, rebuilt from session state on every read |
//! | `use(name)` | select a database, returns the name |
//! | `ObjectId(value)` | `#{ "$oid": value }` |
//! | `console.log(..)` / `console.error(..)` | one line to stdout / stderr |
//! | `assert.eq(a, b, msg)` / `assert.throws(fn)` | non-raising assertions |
//!
//! Collection methods block on the operation bridge. A failed call raises a
//! runtime error at the call site, which scripts can `catch`. The host stops a
//! blocked call through [`ShellRuntime::cancel_handle`].

use rhai::{
    Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext, Position,
    Scope, AST,
};
use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

use docshell_executor::{
    empty_filter, CancelToken, CollectionHandle, DatabaseHandle, DbMember, Document, Error,
    OperationBridge, Result, ShellContext, OID_KEY,
};

use crate::assert::{assert_eq_outcome, assert_throws_outcome};
use crate::convert::{from_document, to_document};
use crate::print::{OutputStream, PrintAdapter, PrintSink};

type Shared = Rc<RefCell<ShellContext>>;
type RhaiResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// The value behind the `console` global.
#[derive(Debug, Clone, Copy)]
pub struct Console;

/// The value behind the `assert` global.
#[derive(Debug, Clone, Copy)]
pub struct Assert;

/// One script instance.
///
/// Owns its session; dropping the runtime ends the session. Variables and
/// `fn` definitions persist across [`ShellRuntime::eval`] calls.
pub struct ShellRuntime {
    engine: Engine,
    scope: Scope<'static>,
    functions: AST,
    context: Shared,
    printer: PrintAdapter,
}

impl std::fmt::Debug for ShellRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellRuntime")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ShellRuntime {
    /// Start an instance over `context`, printing to `sink`.
    pub fn new(context: ShellContext, sink: Arc<dyn PrintSink>) -> Result<Self> {
        let context = Rc::new(RefCell::new(context));
        let printer = PrintAdapter::new(sink);

        let mut engine = Engine::new();
        register_globals(&mut engine, &context)?;
        register_database(&mut engine, &context);
        register_collection(&mut engine, &context);
        register_console(&mut engine, &printer);
        register_assert(&mut engine, &printer);
        register_object_id(&mut engine);

        let stdout = printer.clone();
        engine.on_print(move |text| stdout.line(OutputStream::Stdout, text));
        let stderr = printer.clone();
        engine.on_debug(move |text, _, _| stderr.line(OutputStream::Stderr, text));

        Ok(Self {
            engine,
            scope: Scope::new(),
            functions: AST::empty(),
            context,
            printer,
        })
    }

    /// Evaluate `source`; returns the value of its last expression.
    ///
    /// Clears any cancellation left over from the previous evaluation.
    pub fn eval(&mut self, source: &str) -> Result<Dynamic> {
        debug!(bytes = source.len(), "evaluating script");
        self.context.borrow().bridge().reset_cancel();
        let ast = self
            .engine
            .compile_with_scope(&self.scope, source)
            .map_err(|e| Error::Script {
                reason: e.to_string(),
            })?;
        let runnable = self.functions.merge(&ast);
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &runnable);
        self.functions = runnable.clone_functions_only();
        result.map_err(|e| Error::Script {
            reason: e.to_string(),
        })
    }

    /// Evaluate `source` and convert the result to a document.
    ///
    /// Returns `None` when the script evaluates to unit.
    pub fn eval_document(&mut self, source: &str) -> Result<Option<Document>> {
        let value = self.eval(source)?;
        if value.is_unit() {
            return Ok(None);
        }
        to_document(&value).map(Some)
    }

    /// Read and evaluate a script file
    pub fn eval_file(&mut self, path: &Path) -> Result<Dynamic> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        self.eval(&source)
    }

    /// The instance's session
    pub fn context(&self) -> Ref<'_, ShellContext> {
        self.context.borrow()
    }

    /// `use(name)` from the host side (the REPL's `use <db>` command)
    pub fn select_database(&self, name: &str) -> String {
        self.context.borrow_mut().select_database(name)
    }

    /// Cancels the database call the script is blocked on.
    ///
    /// The call fails with a catchable `cancelled` error. The handle stays
    /// valid for the life of the instance and may be used from any thread.
    pub fn cancel_handle(&self) -> CancelToken {
        self.context.borrow().cancel_token()
    }

    /// Print adapter shared with the script
    pub fn printer(&self) -> &PrintAdapter {
        &self.printer
    }
}

fn raise(err: Error) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(err.to_string().into(), Position::NONE).into()
}

/// Run one bridge call with the session's bridge and hand the result back to the script.
fn dispatch(
    context: &Shared,
    call: impl FnOnce(&OperationBridge) -> Result<Document>,
) -> RhaiResult<Dynamic> {
    let ctx = context.borrow();
    call(ctx.bridge())
        .and_then(|doc| from_document(&doc))
        .map_err(raise)
}

fn document(value: &Dynamic) -> RhaiResult<Document> {
    to_document(value).map_err(raise)
}

/// Marks a `db` value produced by the resolver rather than by the script.
const GLOBAL_DB_TAG: i16 = 0x0db;

/// A `db` binding that is really the global: closures capture free variables
/// when created, and that copy must keep following `use`.
fn is_global_db(value: &Dynamic) -> bool {
    value.tag() == i32::from(GLOBAL_DB_TAG) && value.is::<DatabaseHandle>()
}

/// `db`, `console`, `assert` and `use(..)`.
fn register_globals(engine: &mut Engine, context: &Shared) -> Result<()> {
    let state = Rc::clone(context);
    // consulted on every variable read, inside functions and closures too;
    // a script variable or parameter of the same name wins
    #[allow(deprecated)]
    engine.on_var(move |name, index, ctx| {
        if index > 0 {
            return Ok(None);
        }
        match (name, ctx.scope().get(name)) {
            ("db", None) => Ok(Some(global_db(&state))),
            ("db", Some(bound)) if is_global_db(bound) => Ok(Some(global_db(&state))),
            ("console", None) => Ok(Some(Dynamic::from(Console))),
            ("assert", None) => Ok(Some(Dynamic::from(Assert))),
            _ => Ok(None),
        }
    });

    let state = Rc::clone(context);
    engine
        .register_custom_syntax(["use", "(", "$expr$", ")"], false, move |ctx, inputs| {
            let name = ctx
                .eval_expression_tree(&inputs[0])?
                .into_immutable_string()
                .map_err(|type_name| {
                    raise(Error::InvalidArgument {
                        reason: format!("use() expects a database name, got '{}'", type_name),
                    })
                })?;
            let selected = state.borrow_mut().select_database(&name);
            Ok(selected.into())
        })
        .map_err(|e| Error::Script {
            reason: e.to_string(),
        })?;
    Ok(())
}

fn global_db(context: &Shared) -> Dynamic {
    let mut db = Dynamic::from(context.borrow().db());
    db.set_tag(GLOBAL_DB_TAG.into());
    db
}

fn register_database(engine: &mut Engine, context: &Shared) {
    engine
        .register_type_with_name::<DatabaseHandle>("Database")
        .register_get("name", |db: &mut DatabaseHandle| db.name().to_string())
        .register_get("address", |db: &mut DatabaseHandle| db.address().to_string())
        .register_get("port", |db: &mut DatabaseHandle| i64::from(db.port()))
        .register_fn("getName", |db: &mut DatabaseHandle| db.name().to_string())
        .register_fn("getCollection", |db: &mut DatabaseHandle, name: ImmutableString| {
            db.collection(&name)
        })
        .register_indexer_get(resolve_member)
        .register_fn("to_string", |db: &mut DatabaseHandle| db.to_string())
        .register_fn("to_debug", |db: &mut DatabaseHandle| format!("Database({})", db));

    let state = Rc::clone(context);
    engine.register_fn("listCollections", move |db: &mut DatabaseHandle| {
        dispatch(&state, |bridge| db.list_collections(bridge))
    });
    let state = Rc::clone(context);
    engine.register_fn("listDatabases", move |db: &mut DatabaseHandle| {
        dispatch(&state, |bridge| db.list_databases(bridge))
    });
}

/// `db[name]`, and `db.name` for names without a getter.
fn resolve_member(db: &mut DatabaseHandle, name: ImmutableString) -> RhaiResult<Dynamic> {
    match db.resolve(&name) {
        DbMember::Collection(coll) => Ok(Dynamic::from(coll)),
        DbMember::Name => Ok(db.name().into()),
        DbMember::Address => Ok(db.address().into()),
        DbMember::Port => Ok(Dynamic::from_int(i64::from(db.port()))),
        DbMember::ListCollections
        | DbMember::ListDatabases
        | DbMember::GetCollection
        | DbMember::GetName => {
            Err(raise(Error::InvalidArgument {
                reason: format!("'{}' is a Database method, call it as db.{}()", name, name),
            }))
        }
    }
}

fn register_collection(engine: &mut Engine, context: &Shared) {
    engine
        .register_type_with_name::<CollectionHandle>("Collection")
        .register_get("name", |c: &mut CollectionHandle| c.name().to_string())
        .register_get("database", |c: &mut CollectionHandle| c.database())
        .register_fn("getName", |c: &mut CollectionHandle| c.name().to_string())
        .register_fn("to_string", |c: &mut CollectionHandle| c.to_string())
        .register_fn("to_debug", |c: &mut CollectionHandle| format!("Collection({})", c));

    let state = Rc::clone(context);
    engine.register_fn("find", move |c: &mut CollectionHandle| {
        dispatch(&state, |bridge| c.find(bridge, empty_filter()))
    });
    let state = Rc::clone(context);
    engine.register_fn(
        "find",
        move |c: &mut CollectionHandle, filter: Dynamic| -> RhaiResult<Dynamic> {
            let filter = document(&filter)?;
            dispatch(&state, |bridge| c.find(bridge, filter))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "insertOne",
        move |c: &mut CollectionHandle, doc: Dynamic| -> RhaiResult<Dynamic> {
            let doc = document(&doc)?;
            dispatch(&state, |bridge| c.insert_one(bridge, doc))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "insertMany",
        move |c: &mut CollectionHandle, docs: Dynamic| -> RhaiResult<Dynamic> {
            let docs = document(&docs)?;
            dispatch(&state, |bridge| c.insert_many(bridge, docs))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "updateOne",
        move |c: &mut CollectionHandle, filter: Dynamic, update: Dynamic| -> RhaiResult<Dynamic> {
            let (filter, update) = (document(&filter)?, document(&update)?);
            dispatch(&state, |bridge| c.update_one(bridge, filter, update))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "updateMany",
        move |c: &mut CollectionHandle, filter: Dynamic, update: Dynamic| -> RhaiResult<Dynamic> {
            let (filter, update) = (document(&filter)?, document(&update)?);
            dispatch(&state, |bridge| c.update_many(bridge, filter, update))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "deleteOne",
        move |c: &mut CollectionHandle, filter: Dynamic| -> RhaiResult<Dynamic> {
            let filter = document(&filter)?;
            dispatch(&state, |bridge| c.delete_one(bridge, filter))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "deleteMany",
        move |c: &mut CollectionHandle, filter: Dynamic| -> RhaiResult<Dynamic> {
            let filter = document(&filter)?;
            dispatch(&state, |bridge| c.delete_many(bridge, filter))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn(
        "aggregate",
        move |c: &mut CollectionHandle, pipeline: Dynamic| -> RhaiResult<Dynamic> {
            let pipeline = document(&pipeline)?;
            dispatch(&state, |bridge| c.aggregate(bridge, pipeline))
        },
    );
    let state = Rc::clone(context);
    engine.register_fn("drop", move |c: &mut CollectionHandle| {
        dispatch(&state, |bridge| c.drop(bridge))
    });
    let state = Rc::clone(context);
    engine.register_fn(
        "save",
        move |c: &mut CollectionHandle, doc: Dynamic| -> RhaiResult<Dynamic> {
            let doc = document(&doc)?;
            dispatch(&state, |bridge| c.save(bridge, doc))
        },
    );
}

/// Registers `log` and `error` on `Console` for one arity.
macro_rules! register_console_arity {
    ($engine:expr, $printer:expr, ($($arg:ident),*)) => {{
        let printer = $printer.clone();
        $engine.register_fn("log", move |_: &mut Console, $($arg: Dynamic),*| {
            printer.log(&[$($arg),*]);
        });
        let printer = $printer.clone();
        $engine.register_fn("error", move |_: &mut Console, $($arg: Dynamic),*| {
            printer.error(&[$($arg),*]);
        });
    }};
}

fn register_console(engine: &mut Engine, printer: &PrintAdapter) {
    engine.register_type_with_name::<Console>("Console");
    register_console_arity!(engine, printer, ());
    register_console_arity!(engine, printer, (a));
    register_console_arity!(engine, printer, (a, b));
    register_console_arity!(engine, printer, (a, b, c));
    register_console_arity!(engine, printer, (a, b, c, d));
    register_console_arity!(engine, printer, (a, b, c, d, e));
    register_console_arity!(engine, printer, (a, b, c, d, e, f));
}

fn register_assert(engine: &mut Engine, printer: &PrintAdapter) {
    engine.register_type_with_name::<Assert>("Assert");

    let eq_printer = printer.clone();
    engine.register_fn(
        "eq",
        move |_: &mut Assert, a: Dynamic, b: Dynamic, message: Dynamic| {
            assert_eq_outcome(&eq_printer, &a, &b, message)
        },
    );

    let throws_printer = printer.clone();
    engine.register_fn(
        "throws",
        move |ctx: NativeCallContext, _: &mut Assert, f: FnPtr| {
            assert_throws_outcome(&throws_printer, f.call_within_context::<Dynamic>(&ctx, ()))
        },
    );
}

fn register_object_id(engine: &mut Engine) {
    engine.register_fn("ObjectId", |value: Dynamic| {
        let mut id = Map::new();
        id.insert(OID_KEY.into(), value);
        id
    });
}
