// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recursive decoding of nested call structures.
//!
//! A call argument may be a primitive, another call, or an ordered sequence
//! of calls (`utility.batch` and friends), nested to arbitrary depth. The
//! decoder expands every reachable nested call into a uniform tree and
//! rewrites argument names to the canonical snake_case of the on-chain
//! method signature. Traversal uses an explicit work list rather than native
//! recursion, so adversarially deep nesting cannot exhaust the stack.

use heck::ToSnakeCase;
use serde_json::{Map, Value, json};
use serde::Serialize;
use thiserror::Error;

use crate::types::MethodInfo;

/// A call as handed over by the gateway, before decoding.
///
/// Argument order matches the declared order of the on-chain method
/// signature; names carry whatever casing the node reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCall {
    pub pallet: String,
    pub method: String,
    pub args: Vec<(String, ArgValue)>,
}

/// A single argument value, tagged by its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Primitive passed through unchanged (numbers, strings, bytes, bools).
    Plain(Value),
    /// The argument is itself a dispatchable call. `None` is a placeholder
    /// slot the gateway could not decode.
    Call(Option<Box<RawCall>>),
    /// An ordered sequence of calls, each slot possibly a placeholder.
    Calls(Vec<Option<RawCall>>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedCallError {
    #[error("call is missing its pallet/method identity")]
    MissingMethodIdentity,

    #[error("argument `{0}` expected a call but got an empty value")]
    EmptyCallArgument(String),
}

/// A fully decoded call: `(pallet, method)` identity plus an argument map
/// keyed by snake_case names, with every nested call expanded in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCall {
    pub method: MethodInfo,
    pub args: Map<String, Value>,
}

/// One argument of a call being assembled: either a value that is already
/// final, or a reference into the work list where the nested call(s) live.
enum PlannedArg {
    Plain(Value),
    Child(usize),
    Children(Vec<usize>),
}

/// Decode a call tree.
///
/// Decoding is total: every reachable nested call is fully expanded, sibling
/// order is preserved, and the same input always yields a structurally
/// identical result. Fails when any call in the tree is missing its method
/// identity or a call-typed argument holds a placeholder.
pub fn decode_call(call: &RawCall) -> Result<DecodedCall, MalformedCallError> {
    // Pass 1: breadth-first expansion into a flat work list. Children are
    // appended after their parent, so a child's index is always greater.
    let mut order: Vec<&RawCall> = vec![call];
    let mut plans: Vec<Vec<(String, PlannedArg)>> = Vec::new();
    let mut next = 0;

    while next < order.len() {
        let current = order[next];
        if current.pallet.trim().is_empty() || current.method.trim().is_empty() {
            return Err(MalformedCallError::MissingMethodIdentity);
        }

        let mut plan = Vec::with_capacity(current.args.len());
        for (name, value) in &current.args {
            let key = name.to_snake_case();
            let planned = match value {
                ArgValue::Plain(primitive) => PlannedArg::Plain(primitive.clone()),
                ArgValue::Call(Some(inner)) => {
                    order.push(inner);
                    PlannedArg::Child(order.len() - 1)
                }
                ArgValue::Call(None) => {
                    return Err(MalformedCallError::EmptyCallArgument(key));
                }
                ArgValue::Calls(items) => {
                    let mut children = Vec::with_capacity(items.len());
                    for item in items {
                        let inner = item
                            .as_ref()
                            .ok_or_else(|| MalformedCallError::EmptyCallArgument(key.clone()))?;
                        order.push(inner);
                        children.push(order.len() - 1);
                    }
                    PlannedArg::Children(children)
                }
            };
            plan.push((key, planned));
        }
        plans.push(plan);
        next += 1;
    }

    // Pass 2: assemble bottom-up. Iterating in reverse index order means
    // every nested call is decoded before the call that contains it.
    let mut decoded: Vec<Option<Value>> = (0..order.len()).map(|_| None).collect();
    for index in (1..order.len()).rev() {
        let args = assemble_args(std::mem::take(&mut plans[index]), &mut decoded);
        let method = MethodInfo {
            pallet: order[index].pallet.clone(),
            method: order[index].method.clone(),
        };
        decoded[index] = Some(call_value(&method, args));
    }

    let args = assemble_args(std::mem::take(&mut plans[0]), &mut decoded);
    Ok(DecodedCall {
        method: MethodInfo {
            pallet: call.pallet.clone(),
            method: call.method.clone(),
        },
        args,
    })
}

fn assemble_args(
    plan: Vec<(String, PlannedArg)>,
    decoded: &mut [Option<Value>],
) -> Map<String, Value> {
    let mut args = Map::new();
    for (key, planned) in plan {
        let value = match planned {
            PlannedArg::Plain(primitive) => primitive,
            PlannedArg::Child(child) => take_decoded(decoded, child),
            PlannedArg::Children(children) => Value::Array(
                children
                    .into_iter()
                    .map(|child| take_decoded(decoded, child))
                    .collect(),
            ),
        };
        args.insert(key, value);
    }
    args
}

fn take_decoded(decoded: &mut [Option<Value>], index: usize) -> Value {
    let value = decoded[index].take();
    debug_assert!(value.is_some(), "child calls are decoded before their parent");
    value.unwrap_or(Value::Null)
}

fn call_value(method: &MethodInfo, args: Map<String, Value>) -> Value {
    let mut object = Map::new();
    object.insert(
        "method".to_string(),
        json!({ "pallet": method.pallet, "method": method.method }),
    );
    object.insert("args".to_string(), Value::Object(args));
    Value::Object(object)
}
