// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic helpers shared by the CLI verbs.
//!
//! - [`wait_for`] / [`wait_for_async`]: poll a predicate until it holds or a
//!   deadline passes.
//! - [`bind!`](crate::bind): fix the arguments of a function up front.
//! - [`before_invocation`] / [`before_invocation_with_call`]: run a hook
//!   before every call of a wrapped function.

use std::env;
use std::fmt;
use std::time::{Duration, Instant};

/// Environment variable holding the ROS 2 domain id.
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Default polling period of [`wait_for`].
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// How long a [`wait_for`] loop may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Never take the deadline path.
    Infinite,
    /// Give up once this much time has elapsed.
    After(Duration),
}

impl Timeout {
    /// Build a timeout from seconds; negative (or non-finite) values mean
    /// [`Timeout::Infinite`].
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs < 0.0 {
            return Self::Infinite;
        }
        Duration::try_from_secs_f64(secs).map_or(Self::Infinite, Self::After)
    }

    fn deadline(self, start: Instant) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::After(d) => start.checked_add(d),
        }
    }

    fn deadline_async(self, start: tokio::time::Instant) -> Option<tokio::time::Instant> {
        match self {
            Self::Infinite => None,
            Self::After(d) => start.checked_add(d),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::After(d)
    }
}

/// Block until `predicate` holds or `timeout` elapses, checking every `period`.
///
/// The predicate is evaluated once more after the loop and that value is
/// returned, so a predicate that turns true right at the deadline still
/// reports `true`. An already-true predicate returns without sleeping.
pub fn wait_for<P>(mut predicate: P, timeout: impl Into<Timeout>, period: Duration) -> bool
where
    P: FnMut() -> bool,
{
    let deadline = timeout.into().deadline(Instant::now());
    while !predicate() {
        if deadline.is_some_and(|d| Instant::now() > d) {
            break;
        }
        std::thread::sleep(period);
    }
    predicate()
}

/// Same contract as [`wait_for`], suspending on the tokio timer instead of
/// blocking the thread.
pub async fn wait_for_async<P>(mut predicate: P, timeout: impl Into<Timeout>, period: Duration) -> bool
where
    P: FnMut() -> bool,
{
    let deadline = timeout
        .into()
        .deadline_async(tokio::time::Instant::now());
    while !predicate() {
        if deadline.is_some_and(|d| tokio::time::Instant::now() > d) {
            break;
        }
        tokio::time::sleep(period).await;
    }
    predicate()
}

/// Read `ROS_DOMAIN_ID`, defaulting to 0 when unset or unparsable.
#[must_use]
pub fn ros_domain_id() -> u32 {
    match env::var(ENV_ROS_DOMAIN_ID) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring invalid {}={:?}", ENV_ROS_DOMAIN_ID, raw);
            0
        }),
        Err(_) => 0,
    }
}

/// Call a function with its arguments packed in a tuple.
///
/// Implemented for every `Fn` of up to six arguments; this is what
/// [`bind!`](crate::bind) expands to.
pub trait Apply<Args, R> {
    /// Unpack `args` and call `self`.
    fn apply(&self, args: Args) -> R;
}

macro_rules! impl_apply {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg),*> Apply<($($arg,)*), Ret> for Func
        where
            Func: Fn($($arg),*) -> Ret,
        {
            #[allow(non_snake_case)]
            fn apply(&self, ($($arg,)*): ($($arg,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

impl_apply!();
impl_apply!(A);
impl_apply!(A, B);
impl_apply!(A, B, C);
impl_apply!(A, B, C, D);
impl_apply!(A, B, C, D, E);
impl_apply!(A, B, C, D, E, F);

/// Bind a function to a fixed set of arguments.
///
/// The arguments are evaluated once; every call of the returned closure
/// passes clones of them.
///
/// ```
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// let bound = hdds_param::bind!(add, 1, 2);
/// assert_eq!(bound(), add(1, 2));
/// ```
#[macro_export]
macro_rules! bind {
    ($func:expr $(, $arg:expr)* $(,)?) => {{
        let func = $func;
        let bound = ($($arg,)*);
        move || $crate::helpers::Apply::apply(&func, ::std::clone::Clone::clone(&bound))
    }};
}

/// Render call arguments for an [`Invocation`].
pub trait CallArgs {
    /// Debug representation of each positional argument.
    fn render(&self) -> Vec<String>;
}

macro_rules! impl_call_args {
    ($($arg:ident),*) => {
        impl<$($arg: fmt::Debug),*> CallArgs for ($($arg,)*) {
            #[allow(non_snake_case)]
            fn render(&self) -> Vec<String> {
                let ($($arg,)*) = self;
                vec![$(format!("{:?}", $arg)),*]
            }
        }
    };
}

impl_call_args!();
impl_call_args!(A);
impl_call_args!(A, B);
impl_call_args!(A, B, C);
impl_call_args!(A, B, C, D);
impl_call_args!(A, B, C, D, E);
impl_call_args!(A, B, C, D, E, F);

/// A call about to happen: function name plus rendered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Name of the called function.
    pub name: String,
    /// Positional arguments, already rendered.
    pub args: Vec<String>,
    /// Keyword-style arguments (`key=value`), already rendered.
    pub kwargs: Vec<(String, String)>,
}

impl Invocation {
    /// Describe a call of `name` with positional `args`.
    pub fn new(name: impl Into<String>, args: &impl CallArgs) -> Self {
        Self {
            name: name.into(),
            args: args.render(),
            kwargs: Vec::new(),
        }
    }

    /// Append a keyword-style argument.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: &impl fmt::Debug) -> Self {
        self.kwargs.push((key.into(), format!("{:?}", value)));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .args
            .iter()
            .cloned()
            .chain(self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect();
        write!(f, "{}({})", self.name, rendered.join(", "))
    }
}

/// Print `name(arg, ..., key=value)` on stdout.
pub fn pretty_print_call(call: &Invocation) {
    println!("{}", call);
}

/// Wrap `func` so that `hook` runs before every call.
pub fn before_invocation<A, R, F, H>(func: F, hook: H) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
    H: Fn(),
{
    move |args| {
        hook();
        func(args)
    }
}

/// Wrap `func` so that `hook` sees each call (name and arguments) before it
/// runs. [`pretty_print_call`] is a ready-made hook.
pub fn before_invocation_with_call<A, R, F, H>(
    name: impl Into<String>,
    func: F,
    hook: H,
) -> impl Fn(A) -> R
where
    A: CallArgs,
    F: Fn(A) -> R,
    H: Fn(&Invocation),
{
    let name = name.into();
    move |args| {
        hook(&Invocation::new(name.clone(), &args));
        func(args)
    }
}
