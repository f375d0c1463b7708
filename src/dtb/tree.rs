// ABOUTME: Device tree node view and lazy property/child iteration
// ABOUTME: Nodes are token scanner positions; every query re-walks the structure block

use super::error::DtbError;
use super::property::{Property, StrIter};
use super::tokens::{DtbToken, TokenScanner, split_node_name};
use core::fmt;
use core::iter::FusedIterator;

/// Name shown for the root node, whose stored name is empty
pub const ROOT_NAME: &str = "/";

/// A device tree node.
///
/// This is only a cursor positioned at the node's `FDT_BEGIN_NODE` token, a
/// second one just past it, and the name decoded from it. Properties and
/// children are found by scanning forward from a copy of the second cursor
/// each time they are asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    tokens: TokenScanner<'a>,
    body: TokenScanner<'a>,
    full_name: &'a str,
}

impl<'a> Node<'a> {
    /// Build a node from a cursor sitting at a `FDT_BEGIN_NODE` token.
    ///
    /// Nops in front of the node are skipped; any other token is reported as a
    /// missing node.
    pub fn at(tokens: TokenScanner<'a>) -> Result<Self, DtbError> {
        let mut cursor = tokens;
        loop {
            let before = cursor;
            match cursor.next_token()? {
                Some(DtbToken::BeginNode { full_name, .. }) => {
                    return Ok(Self {
                        tokens: before,
                        body: cursor,
                        full_name,
                    });
                }
                Some(DtbToken::Nop) => continue,
                _ => return Err(DtbError::MissingRootNode),
            }
        }
    }

    /// Node name without unit address, or `/` for the root node
    pub fn name(&self) -> &'a str {
        if self.full_name.is_empty() {
            return ROOT_NAME;
        }
        split_node_name(self.full_name).0
    }

    /// Name as stored in the blob, e.g. `cpu@0`
    pub fn full_name(&self) -> &'a str {
        self.full_name
    }

    /// Hexadecimal unit address following the `@` in the node name
    pub fn unit_address(&self) -> Option<u64> {
        split_node_name(self.full_name).1
    }

    /// Whether this node is the root of the tree
    pub fn is_root(&self) -> bool {
        self.full_name.is_empty()
    }

    /// Offset of the node's begin token within the structure block
    pub fn offset(&self) -> usize {
        self.tokens.offset()
    }

    /// Iterate over the node's own properties
    pub fn properties(&self) -> Properties<'a> {
        Properties {
            tokens: self.body,
            done: false,
        }
    }

    /// Iterate over the node's direct children
    pub fn children(&self) -> Children<'a> {
        Children {
            tokens: self.body,
            depth: 0,
            done: false,
        }
    }

    /// First property called `name`
    pub fn property(&self, name: &str) -> Result<Option<Property<'a>>, DtbError> {
        for prop in self.properties() {
            let prop = prop?;
            if prop.name == name {
                return Ok(Some(prop));
            }
        }
        Ok(None)
    }

    /// First direct child matching `name`.
    ///
    /// `name` is compared with the full node name; a name without `@` also
    /// matches on the base name, so `cpu` finds `cpu@0`.
    pub fn find_child(&self, name: &str) -> Result<Option<Node<'a>>, DtbError> {
        let by_base_name = !name.contains('@');
        for child in self.children() {
            let child = child?;
            if child.full_name == name || (by_base_name && child.name() == name) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Check if property exists
    pub fn has_property(&self, name: &str) -> Result<bool, DtbError> {
        Ok(self.property(name)?.is_some())
    }

    /// Get property value as u32
    pub fn prop_u32(&self, name: &str) -> Result<Option<u32>, DtbError> {
        Ok(self.property(name)?.and_then(|p| p.as_u32()))
    }

    /// Get property value as u64
    pub fn prop_u64(&self, name: &str) -> Result<Option<u64>, DtbError> {
        Ok(self.property(name)?.and_then(|p| p.as_u64()))
    }

    /// Get property value as string
    pub fn prop_str(&self, name: &str) -> Result<Option<&'a str>, DtbError> {
        Ok(self.property(name)?.and_then(|p| p.as_str()))
    }

    /// Entries of the `compatible` property, if there is one
    pub fn compatible(&self) -> Result<Option<StrIter<'a>>, DtbError> {
        Ok(self.property("compatible")?.map(|p| p.iter_str()))
    }

    /// Whether `compatible` lists the given entry
    pub fn is_compatible(&self, compatible: &str) -> Result<bool, DtbError> {
        Ok(self
            .compatible()?
            .is_some_and(|mut entries| entries.any(|entry| entry == compatible)))
    }

    /// Write the subtree rooted at this node in devicetree source syntax.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> Result<(), DtbError> {
        self.dump_at(out, 0)
    }

    fn dump_at<W: fmt::Write>(&self, out: &mut W, depth: usize) -> Result<(), DtbError> {
        let name = if self.is_root() {
            ROOT_NAME
        } else {
            self.full_name
        };
        indent(out, depth)?;
        writeln!(out, "{name} {{")?;

        for prop in self.properties() {
            indent(out, depth + 1)?;
            writeln!(out, "{}", prop?)?;
        }

        for child in self.children() {
            child?.dump_at(out, depth + 1)?;
        }

        indent(out, depth)?;
        writeln!(out, "}};")?;
        Ok(())
    }
}

fn indent<W: fmt::Write>(out: &mut W, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str("    ")?;
    }
    Ok(())
}

/// Iterator over the properties of one node.
///
/// Stops at the first token that is not a property, normally the first child
/// or the node's end.
#[derive(Debug, Clone)]
pub struct Properties<'a> {
    tokens: TokenScanner<'a>,
    done: bool,
}

impl<'a> Iterator for Properties<'a> {
    type Item = Result<Property<'a>, DtbError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.tokens.next_token() {
                Ok(Some(DtbToken::Prop { name, value })) => {
                    return Some(Ok(Property { name, value }));
                }
                Ok(_) => self.done = true,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl FusedIterator for Properties<'_> {}

/// Iterator over the direct children of one node
#[derive(Debug, Clone)]
pub struct Children<'a> {
    tokens: TokenScanner<'a>,
    depth: usize,
    done: bool,
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<Node<'a>, DtbError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let before = self.tokens;
            match self.tokens.next_token() {
                Ok(Some(DtbToken::BeginNode { full_name, .. })) => {
                    self.depth += 1;
                    if self.depth == 1 {
                        return Some(Ok(Node {
                            tokens: before,
                            body: self.tokens,
                            full_name,
                        }));
                    }
                }
                Ok(Some(DtbToken::EndNode)) => {
                    if self.depth == 0 {
                        // Parent's own end
                        self.done = true;
                    } else {
                        self.depth -= 1;
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => self.done = true,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl FusedIterator for Children<'_> {}

/// Iterator over every node in the tree, in document (depth-first) order
#[derive(Debug, Clone)]
pub struct NodeIterator<'a> {
    tokens: TokenScanner<'a>,
    done: bool,
}

impl<'a> NodeIterator<'a> {
    pub(crate) fn new(tokens: TokenScanner<'a>) -> Self {
        Self {
            tokens,
            done: false,
        }
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = Result<Node<'a>, DtbError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let before = self.tokens;
            match self.tokens.next_token() {
                Ok(Some(DtbToken::BeginNode { full_name, .. })) => {
                    return Some(Ok(Node {
                        tokens: before,
                        body: self.tokens,
                        full_name,
                    }));
                }
                Ok(Some(_)) => {}
                Ok(None) => self.done = true,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl FusedIterator for NodeIterator<'_> {}

/// Iterator over the nodes whose `compatible` property lists a given entry
#[derive(Debug, Clone)]
pub struct CompatibleNodes<'a, 'c> {
    nodes: NodeIterator<'a>,
    compatible: &'c str,
    done: bool,
}

impl<'a, 'c> CompatibleNodes<'a, 'c> {
    pub(crate) fn new(nodes: NodeIterator<'a>, compatible: &'c str) -> Self {
        Self {
            nodes,
            compatible,
            done: false,
        }
    }
}

impl<'a> Iterator for CompatibleNodes<'a, '_> {
    type Item = Result<Node<'a>, DtbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let compatible = self.compatible;
        for node in self.nodes.by_ref() {
            let matched = node.and_then(|node| Ok((node, node.is_compatible(compatible)?)));
            match matched {
                Ok((node, true)) => return Some(Ok(node)),
                Ok((_, false)) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        self.done = true;
        None
    }
}

impl FusedIterator for CompatibleNodes<'_, '_> {}
