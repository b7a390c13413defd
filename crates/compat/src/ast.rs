//! The parsed-AST shapes this crate consumes.
//!
//! Per §1 and §6 of the specification, the lexer/parser that turns compat-map
//! source text into these values is an external collaborator — this crate
//! never tokenizes or parses XKB syntax itself. These types exist here only
//! because no sibling parser crate is present in this workspace; a real
//! deployment substitutes its own parser's output types at this seam. The
//! shapes below track the upstream `XkbFile` / `ExprDef` / `*Def` node kinds
//! closely enough that the dispatcher in [`crate::compat_info`] can be
//! ported against a real parser with no change to its logic.

/// Monotonically increasing identifier assigned to each source file in an
/// include graph; used to scope "same origin" diagnostics (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

/// Merge mode attached to nearly every statement and include item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MergeMode {
    /// Inherit the mode of the enclosing scope; never observed once a
    /// statement has actually been resolved against its context.
    #[default]
    Default,
    /// New data is accepted only where old is undefined.
    Augment,
    /// New data wins on conflict.
    Override,
    /// New record wholly supplants old.
    Replace,
}

/// One top-level statement of a parsed compat-map file.
#[derive(Debug, Clone)]
pub enum Statement {
    /// `include "foo(bar)+baz"`.
    Include(IncludeStmt),
    /// `interpret <predicate> { ... }`.
    Interp(InterpDef),
    /// `group N = <mask-expr>`.
    GroupCompat(GroupCompatDef),
    /// `indicator "Name" { ... }`.
    IndicatorMap(IndicatorMapDef),
    /// A bare top-level assignment, e.g. `interpret.repeat = True` or
    /// `action Foo = SetMods(modifiers=Shift)`.
    Var(VarDef),
    /// `virtual_modifiers Meta, Hyper;`.
    VMod(VModDef),
    /// Key code block — never legal inside a compat map (§4.6).
    Keycode(KeycodeDef),
}

/// One file reference inside an include chain, e.g. the `foo(bar)` part of
/// `include "foo(bar)+baz(qux)"`.
#[derive(Debug, Clone)]
pub struct IncludeItem {
    /// The file name to resolve, e.g. `"foo"`.
    pub file_name: String,
    /// The optional map name inside that file, e.g. `"bar"`.
    pub map: Option<String>,
    /// Merge mode this item folds under (shared across a chain, per the
    /// locator's grammar for `+`/`|`).
    pub merge: MergeMode,
}

/// `include "a+b(map)"` — an ordered, left-to-right chain of file references.
#[derive(Debug, Clone)]
pub struct IncludeStmt {
    /// The chain of file/map references, in source order.
    pub items: Vec<IncludeItem>,
}

/// A predicate expression, resolved by [`crate::predicate::parse_predicate`].
#[derive(Debug, Clone)]
pub enum Expr {
    /// A bare identifier: a modifier name, a keyword like `any`, or a
    /// boolean/field reference depending on context.
    Ident(String),
    /// An integer literal, used directly as a mask or a group number.
    Number(i64),
    /// A boolean literal (`True`/`False`, `Yes`/`No`).
    Boolean(bool),
    /// A quoted string literal, e.g. a keysym or indicator name.
    String(String),
    /// `name(args)`, e.g. `anyOf(Shift+Control)` or `SetMods(modifiers=Shift)`.
    Call {
        /// Callee name.
        name: String,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// `a + b` — mask union.
    Or(Box<Expr>, Box<Expr>),
    /// `~a` / `!a` — mask complement.
    Not(Box<Expr>),
    /// `elem.field`, e.g. `interpret.repeat`. `elem` is `None` for a bare
    /// `field` reference.
    FieldRef {
        /// The element name before the dot, if any.
        elem: Option<String>,
        /// The field name after the dot (or the whole name, if no dot).
        field: String,
    },
    /// A named action invocation with keyword arguments, e.g.
    /// `SetMods(modifiers=Shift, clearLocks)`.
    Action {
        /// Action template name (`SetMods`, `LatchMods`, `LockMods`,
        /// `ISOLock`, or a user-defined name from the action registry).
        name: String,
        /// Keyword arguments; a bare flag (`clearLocks`) has an implicit
        /// [`Expr::Boolean`]` true` value.
        args: Vec<(String, Expr)>,
    },
}

/// `interpret <predicate> { ... }`.
#[derive(Debug, Clone)]
pub struct InterpDef {
    /// Merge mode prefix on this statement.
    pub merge: MergeMode,
    /// The predicate clause, e.g. `AnyOf(Shift)` in `interpret AnyOf(Shift) + Return`.
    /// `None` means the predicate clause was entirely absent (§4.7 form (a)).
    pub predicate: Option<Expr>,
    /// The keysym name this interpretation matches, or `None` for the
    /// wildcard "no symbol" interpretation.
    pub sym: Option<String>,
    /// Body assignments (`action`, `repeat`, `locking`, `useModMapMods`, ...).
    pub body: Vec<VarDef>,
}

/// `group N = <mask-expr>`.
#[derive(Debug, Clone)]
pub struct GroupCompatDef {
    /// Merge mode prefix.
    pub merge: MergeMode,
    /// The 1-based group number as written by the author.
    pub group: i64,
    /// Real-modifier mask expression for the group.
    pub expr: Expr,
}

/// `indicator "Name" { ... }`.
#[derive(Debug, Clone)]
pub struct IndicatorMapDef {
    /// Merge mode prefix.
    pub merge: MergeMode,
    /// Indicator (LED) name.
    pub name: String,
    /// Body assignments (`index`, `modifiers`, `groups`, `controls`, ...).
    pub body: Vec<VarDef>,
}

/// A single `elem.field = value` (or bare `field = value`) assignment.
#[derive(Debug, Clone)]
pub struct VarDef {
    /// Merge mode prefix.
    pub merge: MergeMode,
    /// The element name before the dot, if any. `Some("interpret")` /
    /// `Some("indicator")` at top level means a default-field assignment;
    /// anything else there is a [`crate::error::CompatError::ElementDefault`].
    pub elem: Option<String>,
    /// The field name being assigned.
    pub field: String,
    /// The value expression.
    pub value: Expr,
}

/// `virtual_modifiers Name[ = <mask-expr>][, ...];`.
#[derive(Debug, Clone)]
pub struct VModDef {
    /// Merge mode prefix.
    pub merge: MergeMode,
    /// The virtual modifier's name.
    pub name: String,
    /// An optional explicit real-modifier mask to bind the vmod to.
    pub value: Option<Expr>,
}

/// A keycode block — parsed only so the dispatcher can reject it with a
/// proper diagnostic (§4.6: "interpretation files may not include other
/// types").
#[derive(Debug, Clone, Default)]
pub struct KeycodeDef;

/// A fully parsed compat-map source file.
#[derive(Debug, Clone)]
pub struct XkbFile {
    /// The section name, copied onto [`crate::keymap::Keymap::compat_section_name`].
    pub name: String,
    /// This file's identity for merge-diagnostic scoping.
    pub file_id: FileId,
    /// Top-level statements, in source order.
    pub statements: Vec<Statement>,
}
