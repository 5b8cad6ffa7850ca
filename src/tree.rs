//! Compressed prefix tree (radix tree) storing routes.
//!
//! Edges carry multi-byte prefixes, so chains of single-child nodes collapse
//! into one edge and lookup cost tracks path length, not route count. Each
//! node owns a method table; a path is one descent, a method one map probe.
//!
//! The tree has two phases with different contracts. Building
//! ([`Tree::insert`]) mutates freely and is single-threaded — the router is
//! assembled before the server starts. Resolution ([`Tree::resolve`]) takes
//! `&self`, never touches a node, and threads every captured parameter
//! through the call's own [`Params`] list, so any number of requests may
//! resolve against the same tree concurrently.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by index.
//! The parent index exists only for backtracking during resolution; child
//! indices are the ownership edges.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use crate::handler::BoxedHandler;

/// Marks the start of a capturing segment in a route path, as in `/users/:id`.
const PARAM_MARKER: u8 = b':';

const ROOT: usize = 0;

// ── Captured parameters ───────────────────────────────────────────────────────

#[derive(Debug)]
struct Param {
    name: String,
    value: String,
}

/// Path parameters captured while resolving one request, in capture order.
///
/// Lists are short (one entry per `:segment` in the matched route), so lookup
/// is a linear scan; with duplicate names the first capture wins.
#[derive(Debug, Default)]
pub struct Params(Vec<Param>);

impl Params {
    /// Returns the value captured under `name`, if the matched route has
    /// such a segment.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|p| (p.name.as_str(), p.value.as_str()))
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn push(&mut self, name: String, value: String) {
        self.0.push(Param { name, value });
    }

    fn pop(&mut self) -> Option<Param> {
        self.0.pop()
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────────────

enum Kind {
    /// Literal bytes that must match the path exactly.
    Static,
    /// A capturing edge: consumes up to the next `/`, records the bytes
    /// under `name`. The name is fixed by the first registration that
    /// created the node.
    Param { name: String },
}

struct Node {
    /// Bytes this edge consumes. Empty only at the root. For a `Param` node
    /// this is the literal `:name` text from the registered route; the bytes
    /// consumed at resolution time are the capture, not the prefix.
    prefix: Vec<u8>,
    kind: Kind,
    parent: Option<usize>,
    /// Static children. After splitting, no two share a first byte.
    children: Vec<usize>,
    /// At most one parameter edge per node.
    param_child: Option<usize>,
    handlers: HashMap<Method, BoxedHandler>,
}

impl Node {
    fn new(prefix: Vec<u8>, kind: Kind, parent: Option<usize>) -> Self {
        Self {
            prefix,
            kind,
            parent,
            children: Vec::new(),
            param_child: None,
            handlers: HashMap::new(),
        }
    }
}

// ── Tree ──────────────────────────────────────────────────────────────────────

pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::new(Vec::new(), Kind::Static, None)],
        }
    }

    /// Registers `handler` under `method` at `path`.
    ///
    /// Walks the path left to right, consuming it against the tree and
    /// growing the tree where it runs out: unseen static runs become new
    /// edges, a partially-overlapping edge is split around the shared
    /// prefix, `:name` segments become (or reuse) the parameter edge.
    /// Registering the same method and path again replaces the handler.
    ///
    /// An empty path registers the root route `/`. The root node itself
    /// never carries handlers.
    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: BoxedHandler) {
        let path = if path.is_empty() { "/" } else { path };
        let mut at = ROOT;
        let mut rest = path.as_bytes();

        while !rest.is_empty() {
            if rest[0] == PARAM_MARKER {
                let end = segment_end(rest);
                at = match self.nodes[at].param_child {
                    // One parameter edge per node: a second registration
                    // reuses it, keeping the original capture name even if
                    // the new route spells it differently.
                    Some(existing) => existing,
                    None => {
                        let name = String::from_utf8_lossy(&rest[1..end]).into_owned();
                        let child =
                            self.push(Node::new(rest[..end].to_vec(), Kind::Param { name }, Some(at)));
                        self.nodes[at].param_child = Some(child);
                        child
                    }
                };
                rest = &rest[end..];
                continue;
            }

            // The static run to insert ends where the next capture begins.
            let run = rest
                .iter()
                .position(|&b| b == PARAM_MARKER)
                .unwrap_or(rest.len());

            match self.closest_child(at, rest) {
                None => {
                    let child = self.push(Node::new(rest[..run].to_vec(), Kind::Static, Some(at)));
                    self.nodes[at].children.push(child);
                    at = child;
                    rest = &rest[run..];
                }
                Some((child, shared)) if shared == self.nodes[child].prefix.len() => {
                    at = child;
                    rest = &rest[shared..];
                }
                Some((child, shared)) => {
                    at = self.split(at, child, shared);
                    rest = &rest[shared..];
                }
            }
        }

        self.nodes[at].handlers.insert(method, handler);
    }

    /// Resolves `path` to the handler registered for `method`, with the
    /// values captured along the way.
    ///
    /// Three-phase cycle until the path is consumed or no branch remains:
    /// descend fully-matching static edges, then — if path remains — climb
    /// back toward the root looking for a parameter branch not yet tried,
    /// capture one segment through it, and repeat. Climbing restores what
    /// the descent consumed (the edge prefix, or the popped capture when
    /// leaving a parameter node), so the unconsumed remainder is always a
    /// suffix of `path` and a single byte offset tracks it.
    ///
    /// A fully consumed path whose node has no entry for `method` is the
    /// same result as no match at all.
    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Option<(BoxedHandler, Params)> {
        let mut params = Params::default();
        self.resolve_into(method, path, &mut params).map(|h| (h, params))
    }

    /// [`Tree::resolve`], capturing into a caller-supplied list so a pooled
    /// allocation can be reused. The list is overwritten, never appended to;
    /// on a miss it may hold captures from abandoned branches.
    pub(crate) fn resolve_into(
        &self,
        method: &Method,
        path: &str,
        params: &mut Params,
    ) -> Option<BoxedHandler> {
        params.clear();
        let path = if path.is_empty() { "/" } else { path };
        let bytes = path.as_bytes();
        let mut at = ROOT;
        let mut pos = 0;

        loop {
            // Static descent. Only a fully matched edge is entered: a
            // partial overlap means every route below it diverges from the
            // path, and stopping here keeps the consumed bytes equal to the
            // concatenated prefixes above `at`.
            while pos < bytes.len() {
                match self.closest_child(at, &bytes[pos..]) {
                    Some((child, shared)) if shared == self.nodes[child].prefix.len() => {
                        at = child;
                        pos += shared;
                    }
                    _ => break,
                }
            }

            if pos == bytes.len() {
                return self.nodes[at].handlers.get(method).map(Arc::clone);
            }

            // Backtrack. A node's parameter branch is a candidate unless the
            // climb just came out of it; passing the root means no match.
            let mut came_from = None;
            let branch = loop {
                let node = &self.nodes[at];
                if let Some(param) = node.param_child {
                    if came_from != Some(param) {
                        break param;
                    }
                }
                pos -= match node.kind {
                    Kind::Static => node.prefix.len(),
                    Kind::Param { .. } => match params.pop() {
                        Some(p) => p.value.len(),
                        None => return None,
                    },
                };
                came_from = Some(at);
                at = node.parent?;
            };

            // Parameter descent: the capture runs to the next `/` or the
            // end of the path, and belongs to this call alone.
            let end = pos + segment_end(&bytes[pos..]);
            if let Kind::Param { ref name } = self.nodes[branch].kind {
                let value = String::from_utf8_lossy(&bytes[pos..end]).into_owned();
                params.push(name.clone(), value);
            }
            at = branch;
            pos = end;
        }
    }

    /// The static child of `at` sharing the most leading bytes with `rest`,
    /// with the shared length. Zero shared bytes is no candidate. After
    /// splitting, siblings never share a first byte, so at most one child
    /// can win.
    fn closest_child(&self, at: usize, rest: &[u8]) -> Option<(usize, usize)> {
        let mut best = None;
        for &child in &self.nodes[at].children {
            let shared = common_prefix(&self.nodes[child].prefix, rest);
            if shared > 0 && best.map_or(true, |(_, len)| shared > len) {
                best = Some((child, shared));
            }
        }
        best
    }

    /// Splits `child` around its first `shared` bytes: a new intermediate
    /// node takes the shared head and `child`'s slot under `parent`, and
    /// `child` is re-parented below it with the remainder as its prefix.
    /// Routes registered through `child` keep resolving unchanged.
    fn split(&mut self, parent: usize, child: usize, shared: usize) -> usize {
        let tail = self.nodes[child].prefix.split_off(shared);
        let head = std::mem::replace(&mut self.nodes[child].prefix, tail);
        let mid = self.push(Node::new(head, Kind::Static, Some(parent)));
        self.nodes[child].parent = Some(mid);
        self.nodes[mid].children.push(child);
        for slot in &mut self.nodes[parent].children {
            if *slot == child {
                *slot = mid;
                break;
            }
        }
        mid
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the current segment: bytes up to the next `/` or end of input.
fn segment_end(rest: &[u8]) -> usize {
    rest.iter().position(|&b| b == b'/').unwrap_or(rest.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::{Context, Response};

    fn handler() -> BoxedHandler {
        (|_ctx: Context| async { Response::text("ok") }).into_boxed_handler()
    }

    fn same(a: &BoxedHandler, b: &BoxedHandler) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[test]
    fn round_trip_single_capture() {
        let mut tree = Tree::new();
        let h = handler();
        tree.insert(Method::GET, "/users/:id", Arc::clone(&h));

        let (found, params) = tree.resolve(&Method::GET, "/users/42").expect("match");
        assert!(same(&found, &h));
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn split_factors_out_the_shared_prefix() {
        for order in [["/cat", "/car"], ["/car", "/cat"]] {
            let mut tree = Tree::new();
            let (a, b) = (handler(), handler());
            tree.insert(Method::GET, order[0], Arc::clone(&a));
            tree.insert(Method::GET, order[1], Arc::clone(&b));

            let (cat, _) = tree.resolve(&Method::GET, order[0]).expect("first");
            let (car, _) = tree.resolve(&Method::GET, order[1]).expect("second");
            assert!(same(&cat, &a));
            assert!(same(&car, &b));

            // Regardless of insertion order the shared run lives on one
            // intermediate node with single-byte children under it.
            let mid = tree
                .nodes
                .iter()
                .find(|n| n.prefix == b"/ca")
                .expect("intermediate node");
            let mut leaves: Vec<&[u8]> = mid
                .children
                .iter()
                .map(|&c| tree.nodes[c].prefix.as_slice())
                .collect();
            leaves.sort();
            assert_eq!(leaves, [b"r".as_slice(), b"t".as_slice()]);
        }
    }

    #[test]
    fn static_route_wins_over_capture() {
        let mut tree = Tree::new();
        let (fixed, capture) = (handler(), handler());
        tree.insert(Method::GET, "/a/b", Arc::clone(&fixed));
        tree.insert(Method::GET, "/a/:id", Arc::clone(&capture));

        let (found, params) = tree.resolve(&Method::GET, "/a/b").expect("static");
        assert!(same(&found, &fixed));
        assert!(params.is_empty());

        let (found, params) = tree.resolve(&Method::GET, "/a/x").expect("capture");
        assert!(same(&found, &capture));
        assert_eq!(params.get("id"), Some("x"));
    }

    #[test]
    fn unmatched_path_is_none() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/users/:id", handler());
        assert!(tree.resolve(&Method::GET, "/nope").is_none());
    }

    #[test]
    fn method_not_bound_is_a_miss() {
        let mut tree = Tree::new();
        tree.insert(Method::POST, "/p", handler());
        assert!(tree.resolve(&Method::GET, "/p").is_none());
    }

    #[test]
    fn reregistration_replaces_the_handler() {
        let mut tree = Tree::new();
        let (first, second) = (handler(), handler());
        tree.insert(Method::GET, "/p", Arc::clone(&first));
        tree.insert(Method::GET, "/p", Arc::clone(&second));

        let (found, _) = tree.resolve(&Method::GET, "/p").expect("match");
        assert!(same(&found, &second));
    }

    #[test]
    fn captures_accumulate_in_path_order() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/users/:id/posts/:post_id", handler());

        let (_, params) = tree.resolve(&Method::GET, "/users/7/posts/19").expect("match");
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, [("id", "7"), ("post_id", "19")]);
    }

    #[test]
    fn failed_capture_subtree_backtracks_out() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/:a/x", handler());

        // The capture branch consumes "q" but nothing below it matches
        // "/y"; the climb must restore the capture and conclude no-match
        // rather than retrying the same branch.
        assert!(tree.resolve(&Method::GET, "/q/y").is_none());
    }

    #[test]
    fn capture_fallback_after_deep_static_miss() {
        let mut tree = Tree::new();
        let (fixed, capture) = (handler(), handler());
        tree.insert(Method::GET, "/ab/c", Arc::clone(&fixed));
        tree.insert(Method::GET, "/:x/d", Arc::clone(&capture));

        // "/ab/d" runs aground inside the static edge and must fall back
        // to capturing "ab".
        let (found, params) = tree.resolve(&Method::GET, "/ab/d").expect("fallback");
        assert!(same(&found, &capture));
        assert_eq!(params.get("x"), Some("ab"));

        let (found, _) = tree.resolve(&Method::GET, "/ab/c").expect("static");
        assert!(same(&found, &fixed));
    }

    #[test]
    fn capture_name_is_fixed_at_first_registration() {
        let mut tree = Tree::new();
        let (first, second) = (handler(), handler());
        tree.insert(Method::GET, "/u/:id", Arc::clone(&first));
        tree.insert(Method::GET, "/u/:name", Arc::clone(&second));

        // Same node: the handler is replaced but the capture keeps the
        // first-registered name.
        let (found, params) = tree.resolve(&Method::GET, "/u/9").expect("match");
        assert!(same(&found, &second));
        assert_eq!(params.get("id"), Some("9"));
        assert_eq!(params.get("name"), None);
    }

    #[test]
    fn marker_inside_a_segment_joins_the_capture_name() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/:a:b", handler());

        // No separator between the markers, so the scan produces a single
        // capture named "a:b" spanning the whole segment.
        let (_, params) = tree.resolve(&Method::GET, "/xyz").expect("match");
        assert_eq!(params.get("a:b"), Some("xyz"));
    }

    #[test]
    fn empty_segment_captures_empty_value() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/:a/x", handler());

        let (_, params) = tree.resolve(&Method::GET, "//x").expect("match");
        assert_eq!(params.get("a"), Some(""));
    }

    #[test]
    fn root_route_via_empty_or_slash() {
        let mut tree = Tree::new();
        let h = handler();
        tree.insert(Method::GET, "", Arc::clone(&h));

        let (found, _) = tree.resolve(&Method::GET, "/").expect("slash");
        assert!(same(&found, &h));
        let (found, _) = tree.resolve(&Method::GET, "").expect("empty");
        assert!(same(&found, &h));

        // The root node itself stays handler-free.
        assert!(tree.nodes[ROOT].handlers.is_empty());
    }

    #[test]
    fn resolution_leaves_no_residue() {
        let mut tree = Tree::new();
        tree.insert(Method::GET, "/users/:id", handler());

        let (_, first) = tree.resolve(&Method::GET, "/users/1").expect("first");
        let (_, second) = tree.resolve(&Method::GET, "/users/2").expect("second");
        assert_eq!(first.get("id"), Some("1"));
        assert_eq!(second.get("id"), Some("2"));
    }
}
