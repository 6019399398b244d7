//! Opcode helpers: pure functions that build graph nodes.
//!
//! Each helper resolves its operands (bare numbers become `const` nodes) and
//! returns a [`Node`]. Composite helpers such as [`cycle`] and [`adsr`] expand
//! into primitive nodes, so identical voices built twice share every hash.
//!
//! ```rust
//! use signet_core::ops::{cycle, mul};
//!
//! let a = mul(cycle(440.0), 0.5);
//! let b = mul(cycle(440.0), 0.5);
//! assert_eq!(a.hash(), b.hash());
//! ```

use core::f64::consts::TAU;

use crate::error::GraphError;
use crate::node::{Node, Operand};
use crate::props::{KEY_PROP, PropValue, Props};

/// Builds a node of `kind`, resolving every operand into a child node.
///
/// Fails with [`GraphError::EmptyKind`] if `kind` is empty.
pub fn create(
    kind: impl Into<String>,
    props: Props,
    operands: impl IntoIterator<Item = impl Into<Operand>>,
) -> Result<Node, GraphError> {
    Node::try_new(kind, props, resolve(operands))
}

fn primitive(
    kind: &'static str,
    props: Props,
    operands: impl IntoIterator<Item = impl Into<Operand>>,
) -> Node {
    Node::new(kind, props, resolve(operands))
}

fn resolve(operands: impl IntoIterator<Item = impl Into<Operand>>) -> Vec<Node> {
    operands.into_iter().map(|o| operand(o).into_node()).collect()
}

fn operand(x: impl Into<Operand>) -> Operand {
    x.into()
}

/// `const {value}`.
pub fn constant(value: f64) -> Node {
    Node::constant(value)
}

/// `const {key, value}`: a constant whose identity is `key`, so changing its
/// value updates the existing native node instead of mounting a new one.
pub fn keyed_constant(key: &str, value: f64) -> Node {
    let mut props = Props::new();
    props.insert(KEY_PROP.to_owned(), PropValue::from(key));
    props.insert("value".to_owned(), PropValue::Number(value));
    Node::new("const", props, Vec::new())
}

/// `in {channel}`: the host's input signal for `channel`.
pub fn input(channel: usize) -> Node {
    let mut props = Props::new();
    props.insert("channel".to_owned(), PropValue::from(channel));
    Node::new("in", props, Vec::new())
}

/// Current sample rate.
pub fn sr() -> Node {
    Node::new("sr", Props::new(), Vec::new())
}

/// Current time in samples.
pub fn time() -> Node {
    Node::new("time", Props::new(), Vec::new())
}

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $name:ident => $kind:literal;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(x: impl Into<Operand>) -> Node {
                primitive($kind, Props::new(), [operand(x)])
            }
        )+
    };
}

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $name:ident => $kind:literal;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
                primitive($kind, Props::new(), [operand(a), operand(b)])
            }
        )+
    };
}

unary_ops! {
    /// Counts samples while the gate is high.
    counter => "counter";
    /// Ramp from 0 to 1 at the given rate in Hz.
    phasor => "phasor";
    /// Sine of the input, in radians.
    sin => "sin";
    /// Cosine of the input, in radians.
    cos => "cos";
    /// Hyperbolic tangent.
    tanh => "tanh";
    /// Absolute value.
    abs => "abs";
    /// Converts a time constant in seconds into a one-pole coefficient.
    tau2pole => "tau2pole";
}

binary_ops! {
    /// `a + b`.
    add => "add";
    /// `a - b`.
    sub => "sub";
    /// `a * b`.
    mul => "mul";
    /// `a / b`.
    div => "div";
    /// `1` when `a <= b`, else `0`.
    le => "le";
    /// One-pole smoothing of `x` with pole `p`.
    smooth => "smooth";
}

/// Sums any number of operands in a single `add` node.
pub fn sum(operands: impl IntoIterator<Item = impl Into<Operand>>) -> Node {
    primitive("add", Props::new(), operands)
}

/// `cond ? a : b`, sample by sample.
pub fn select(
    cond: impl Into<Operand>,
    a: impl Into<Operand>,
    b: impl Into<Operand>,
) -> Node {
    primitive("select", Props::new(), [operand(cond), operand(a), operand(b)])
}

/// Sine oscillator at `rate` Hz.
pub fn cycle(rate: impl Into<Operand>) -> Node {
    sin(mul(TAU, phasor(rate)))
}

/// Naive sawtooth in `[-1, 1]` at `rate` Hz.
pub fn saw(rate: impl Into<Operand>) -> Node {
    sub(mul(2.0, phasor(rate)), 1.0)
}

/// Exponential ADSR envelope driven by `gate`.
///
/// `attack`, `decay` and `release` are in seconds; `sustain` is a level.
pub fn adsr(
    attack: impl Into<Operand>,
    decay: impl Into<Operand>,
    sustain: impl Into<Operand>,
    release: impl Into<Operand>,
    gate: impl Into<Operand>,
) -> Node {
    let attack = operand(attack).into_node();
    let decay = operand(decay).into_node();
    let sustain = operand(sustain).into_node();
    let release = operand(release).into_node();
    let gate = operand(gate).into_node();

    let attack_samples = mul(&attack, sr());
    let attack_gate = le(counter(&gate), attack_samples);
    let target = select(&gate, select(&attack_gate, 1.0, &sustain), 0.0);
    let t60 = select(&gate, select(&attack_gate, &attack, &decay), &release);
    let pole = tau2pole(div(t60, 6.91));
    smooth(pole, target)
}
