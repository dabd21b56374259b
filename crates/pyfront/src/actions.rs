use crate::ast::{BoolOpKind, CmpOp, NodeKind, Operator, UnaryOpKind};
use crate::diagnostics::{Diagnostic, Span};
use crate::errors::{ErrorPolicy, ParseError};
use crate::literals::{decode_number, decode_string, is_unicode_literal, SourceEncoding};
use crate::tree::{Arena, NodeId};

/// Node-building actions shared by the grammar productions.
///
/// Owns the arena and the diagnostic sink for one parse and routes every
/// syntactic and semantic error through the selected policy: `FailFast`
/// converts the diagnostic into an error on the spot, `Record` appends it
/// and lets the caller continue.
pub struct Builder {
    pub arena: Arena,
    pub diagnostics: Vec<Diagnostic>,
    pub policy: ErrorPolicy,
    pub path: String,
    pub encoding: SourceEncoding,
}

enum TargetUse {
    Assign,
    Delete,
}

impl TargetUse {
    fn verb(&self) -> &'static str {
        match self {
            TargetUse::Assign => "assign to",
            TargetUse::Delete => "delete",
        }
    }
}

impl Builder {
    pub fn new(path: &str, policy: ErrorPolicy, encoding: SourceEncoding) -> Builder {
        Builder {
            arena: Arena::new(),
            diagnostics: Vec::new(),
            policy,
            path: path.to_string(),
            encoding,
        }
    }

    /// Routes a diagnostic through the active policy.
    pub fn report(&mut self, code: &str, message: impl Into<String>, span: Span) -> Result<(), ParseError> {
        let diagnostic = Diagnostic::error(code, message, span);
        match self.policy {
            ErrorPolicy::FailFast => Err(ParseError::syntax(&self.path, diagnostic)),
            ErrorPolicy::Record => {
                self.diagnostics.push(diagnostic);
                Ok(())
            }
        }
    }

    fn report_at(&mut self, code: &str, message: String, node: NodeId) -> Result<(), ParseError> {
        let span = self.node_span(node);
        self.report(code, message, span)
    }

    fn node_span(&self, node: NodeId) -> Span {
        let node = self.arena.node(node);
        Span::point(node.line.max(1), node.column + 1)
    }

    pub fn error_module(&mut self) -> NodeId {
        self.arena.add(NodeKind::ErrorModule)
    }

    pub fn error_stmt(&mut self) -> NodeId {
        self.arena.add(NodeKind::ErrorStmt)
    }

    pub fn error_expr(&mut self) -> NodeId {
        self.arena.add(NodeKind::ErrorExpr)
    }

    pub fn error_slice(&mut self) -> NodeId {
        self.arena.add(NodeKind::ErrorSlice)
    }

    pub fn name(&mut self, id: &str) -> NodeId {
        self.arena.add(NodeKind::Name { id: id.to_string() })
    }

    /// Decodes a numeric literal token into a `Num` node. A literal the
    /// decoder rejects reports and degrades to an expression error node.
    pub fn num_literal(&mut self, text: &str, span: Span) -> Result<NodeId, ParseError> {
        match decode_number(text) {
            Ok(value) => Ok(self.arena.add(NodeKind::NumLit { value })),
            Err(message) => {
                self.report("E1501", message, span)?;
                Ok(self.error_expr())
            }
        }
    }

    /// Decodes one or more adjacent string literal tokens into a single
    /// `Str` node. The result is unicode when any part is.
    pub fn str_literal(&mut self, parts: &[(String, Span)]) -> Result<NodeId, ParseError> {
        let unicode = parts.iter().any(|(text, _)| is_unicode_literal(text));
        let mut text_acc = String::new();
        let mut byte_acc: Vec<u8> = Vec::new();
        for (text, span) in parts {
            match decode_string(text, self.encoding) {
                Ok(crate::ast::Str::Unicode(part)) => text_acc.push_str(&part),
                Ok(crate::ast::Str::Bytes(part)) => {
                    if unicode {
                        text_acc.push_str(&String::from_utf8_lossy(&part));
                    } else {
                        byte_acc.extend(part);
                    }
                }
                Err(message) => {
                    self.report("E1502", message, *span)?;
                    return Ok(self.error_expr());
                }
            }
        }
        let value = if unicode {
            crate::ast::Str::Unicode(text_acc)
        } else {
            crate::ast::Str::Bytes(byte_acc)
        };
        Ok(self.arena.add(NodeKind::StrLit { value }))
    }

    /// Left-associative `and`/`or` assembly. An unparenthesized operand
    /// that is already the same boolean operator absorbs the new operand
    /// instead of nesting.
    pub fn bool_op(&mut self, op: BoolOpKind, left: NodeId, right: NodeId) -> NodeId {
        if let NodeKind::BoolOp { op: left_op } = self.arena.kind(left) {
            if *left_op == op && !self.arena.is_parenthesized(left) {
                self.arena.push_child(left, right);
                return left;
            }
        }
        let node = self.arena.add(NodeKind::BoolOp { op });
        self.arena.push_child(node, left);
        self.arena.push_child(node, right);
        node
    }

    /// Chained-comparison assembly: `a < b < c` folds into one node with
    /// parallel operator and operand lists unless the left side was
    /// parenthesized.
    pub fn compare(&mut self, left: NodeId, op: CmpOp, right: NodeId) -> NodeId {
        if matches!(self.arena.kind(left), NodeKind::Compare { .. })
            && !self.arena.is_parenthesized(left)
        {
            if let NodeKind::Compare { ops } = &mut self.arena.node_mut(left).kind {
                ops.push(op);
            }
            self.arena.push_child(left, right);
            return left;
        }
        let node = self.arena.add(NodeKind::Compare { ops: vec![op] });
        self.arena.push_child(node, left);
        self.arena.push_child(node, right);
        node
    }

    pub fn bin_op(&mut self, op: Operator, left: NodeId, right: NodeId) -> NodeId {
        let node = self.arena.add(NodeKind::BinOp { op });
        self.arena.push_child(node, left);
        self.arena.push_child(node, right);
        node
    }

    pub fn unary_op(&mut self, op: UnaryOpKind, operand: NodeId) -> NodeId {
        let node = self.arena.add(NodeKind::UnaryOp { op });
        self.arena.push_child(node, operand);
        node
    }

    /// A subscript without a colon: plain index.
    pub fn index_item(&mut self, value: NodeId) -> NodeId {
        let node = self.arena.add(NodeKind::Index);
        self.arena.push_child(node, value);
        node
    }

    /// A subscript with colons. The step slot is always present; an
    /// omitted step becomes an explicit `None` name so consumers see a
    /// fixed shape.
    pub fn slice_item(
        &mut self,
        lower: Option<NodeId>,
        upper: Option<NodeId>,
        step: Option<NodeId>,
    ) -> NodeId {
        let node = self.arena.add(NodeKind::Slice {
            has_lower: lower.is_some(),
            has_upper: upper.is_some(),
        });
        if let Some(lower) = lower {
            self.arena.push_child(node, lower);
        }
        if let Some(upper) = upper {
            self.arena.push_child(node, upper);
        }
        let step = match step {
            Some(step) => step,
            None => self.name("None"),
        };
        self.arena.push_child(node, step);
        node
    }

    pub fn ellipsis_item(&mut self) -> NodeId {
        self.arena.add(NodeKind::Ellipsis)
    }

    /// Merges the comma-separated subscript list: a lone item stands
    /// alone; all-index lists collapse into an index over a tuple; any
    /// non-trivial item makes the whole an extended slice. A trailing
    /// comma makes even a single index a tuple.
    pub fn combine_subscripts(&mut self, items: Vec<NodeId>, trailing_comma: bool) -> NodeId {
        if items.len() == 1 && !trailing_comma {
            return items[0];
        }
        let all_index = items
            .iter()
            .all(|item| matches!(self.arena.kind(*item), NodeKind::Index));
        if all_index {
            let tuple = self.arena.add(NodeKind::Tuple);
            for item in &items {
                let value = self.arena.children(*item)[0];
                self.arena.push_child(tuple, value);
            }
            self.copy_range(tuple, items[0], items[items.len() - 1]);
            let index = self.arena.add(NodeKind::Index);
            self.arena.push_child(index, tuple);
            self.copy_range(index, items[0], items[items.len() - 1]);
            index
        } else {
            let ext = self.arena.add(NodeKind::ExtSlice);
            let first = items[0];
            let last = items[items.len() - 1];
            for item in items {
                self.arena.push_child(ext, item);
            }
            self.copy_range(ext, first, last);
            ext
        }
    }

    pub fn subscript(&mut self, value: NodeId, slice: NodeId) -> NodeId {
        let node = self.arena.add(NodeKind::Subscript);
        self.arena.push_child(node, value);
        self.arena.push_child(node, slice);
        node
    }

    pub fn attribute(&mut self, value: NodeId, attr: &str) -> NodeId {
        let node = self.arena.add(NodeKind::Attribute {
            attr: attr.to_string(),
        });
        self.arena.push_child(node, value);
        node
    }

    /// Call assembly. Repeated keyword names report through the policy.
    pub fn call(
        &mut self,
        func: NodeId,
        args: Vec<NodeId>,
        keywords: Vec<(String, Span, NodeId)>,
        star: Option<NodeId>,
        dstar: Option<NodeId>,
    ) -> Result<NodeId, ParseError> {
        let mut seen: Vec<&String> = Vec::new();
        for (name, span, _) in &keywords {
            if seen.contains(&name) {
                let span = *span;
                self.report("E1602", format!("keyword argument repeated: {name}"), span)?;
            } else {
                seen.push(name);
            }
        }
        let node = self.arena.add(NodeKind::Call {
            has_star: star.is_some(),
            has_dstar: dstar.is_some(),
        });
        self.arena.push_child(node, func);
        for arg in args {
            self.arena.push_child(node, arg);
        }
        for (name, _, value) in keywords {
            let keyword = self.arena.add(NodeKind::Keyword { name });
            self.arena.push_child(keyword, value);
            self.copy_range(keyword, value, value);
            self.arena.push_child(node, keyword);
        }
        if let Some(star) = star {
            self.arena.push_child(node, star);
        }
        if let Some(dstar) = dstar {
            self.arena.push_child(node, dstar);
        }
        Ok(node)
    }

    /// One `for ... in ... [if ...]*` clause of a comprehension. The loop
    /// target obeys assignment legality.
    pub fn comprehension(
        &mut self,
        target: NodeId,
        iter: NodeId,
        ifs: Vec<NodeId>,
    ) -> Result<NodeId, ParseError> {
        self.check_assign(target)?;
        let node = self.arena.add(NodeKind::Comprehension);
        self.arena.push_child(node, target);
        self.arena.push_child(node, iter);
        for cond in ifs {
            self.arena.push_child(node, cond);
        }
        Ok(node)
    }

    pub fn assign(&mut self, targets: Vec<NodeId>, value: NodeId) -> Result<NodeId, ParseError> {
        for target in &targets {
            self.check_assign(*target)?;
        }
        let node = self.arena.add(NodeKind::Assign);
        for target in targets {
            self.arena.push_child(node, target);
        }
        self.arena.push_child(node, value);
        Ok(node)
    }

    pub fn aug_assign(
        &mut self,
        op: Operator,
        target: NodeId,
        value: NodeId,
    ) -> Result<NodeId, ParseError> {
        if matches!(
            self.arena.kind(target),
            NodeKind::Tuple | NodeKind::List
        ) {
            self.report_at(
                "E1600",
                "illegal expression for augmented assignment".to_string(),
                target,
            )?;
        } else {
            self.check_assign(target)?;
        }
        let node = self.arena.add(NodeKind::AugAssign { op });
        self.arena.push_child(node, target);
        self.arena.push_child(node, value);
        Ok(node)
    }

    pub fn del_stmt(&mut self, targets: Vec<NodeId>) -> Result<NodeId, ParseError> {
        for target in &targets {
            self.check_delete(*target)?;
        }
        let node = self.arena.add(NodeKind::Del);
        for target in targets {
            self.arena.push_child(node, target);
        }
        Ok(node)
    }

    pub fn print_stmt(
        &mut self,
        dest: Option<NodeId>,
        values: Vec<NodeId>,
        trailing_comma: bool,
    ) -> NodeId {
        let node = self.arena.add(NodeKind::Print {
            has_dest: dest.is_some(),
            newline: !trailing_comma,
        });
        if let Some(dest) = dest {
            self.arena.push_child(node, dest);
        }
        for value in values {
            self.arena.push_child(node, value);
        }
        node
    }

    /// Duplicate-name check over a parameter list of `Param` nodes.
    pub fn check_params(&mut self, params: &[NodeId]) -> Result<(), ParseError> {
        let mut seen: Vec<String> = Vec::new();
        for param in params {
            let name = match self.arena.kind(*param) {
                NodeKind::Param { name } => name.clone(),
                _ => continue,
            };
            if seen.contains(&name) {
                self.report_at(
                    "E1601",
                    format!("duplicate argument '{name}' in function definition"),
                    *param,
                )?;
            } else {
                seen.push(name);
            }
        }
        Ok(())
    }

    /// Recursive assignment-target legality.
    pub fn check_assign(&mut self, target: NodeId) -> Result<(), ParseError> {
        self.check_target(target, &TargetUse::Assign)
    }

    /// Recursive delete-target legality; same shape rules as assignment.
    pub fn check_delete(&mut self, target: NodeId) -> Result<(), ParseError> {
        self.check_target(target, &TargetUse::Delete)
    }

    fn check_target(&mut self, target: NodeId, target_use: &TargetUse) -> Result<(), ParseError> {
        let verb = target_use.verb();
        let illegal = match self.arena.kind(target) {
            NodeKind::Name { id } if id == "None" => {
                return self.report_at("E1600", format!("cannot {verb} None"), target);
            }
            NodeKind::Name { .. } | NodeKind::Attribute { .. } | NodeKind::Subscript => None,
            NodeKind::ErrorExpr => None,
            NodeKind::Tuple | NodeKind::List => {
                let children = self.arena.children(target).to_vec();
                if children.is_empty() {
                    let what = if matches!(self.arena.kind(target), NodeKind::Tuple) {
                        "()"
                    } else {
                        "[]"
                    };
                    return self.report_at("E1600", format!("can't {verb} {what}"), target);
                }
                for child in children {
                    self.check_target(child, target_use)?;
                }
                None
            }
            NodeKind::NumLit { .. } | NodeKind::StrLit { .. } | NodeKind::Dict => Some("literal"),
            NodeKind::BinOp { .. }
            | NodeKind::UnaryOp { .. }
            | NodeKind::BoolOp { .. }
            | NodeKind::Compare { .. } => Some("operator"),
            NodeKind::Lambda => Some("lambda"),
            NodeKind::Call { .. } => Some("function call"),
            NodeKind::GeneratorExp => Some("generator expression"),
            NodeKind::ListComp => Some("list comprehension"),
            NodeKind::IfExp => Some("conditional expression"),
            NodeKind::Repr => Some("repr"),
            NodeKind::YieldExpr { .. } => Some("yield expression"),
            _ => Some("this expression"),
        };
        if let Some(what) = illegal {
            return self.report_at("E1600", format!("can't {verb} {what}"), target);
        }
        Ok(())
    }

    fn copy_range(&mut self, node: NodeId, first: NodeId, last: NodeId) {
        let (token_start, char_start, line, column) = {
            let first = self.arena.node(first);
            (first.token_start, first.char_start, first.line, first.column)
        };
        let (token_stop, char_stop) = {
            let last = self.arena.node(last);
            (last.token_stop, last.char_stop)
        };
        let node = self.arena.node_mut(node);
        node.token_start = token_start;
        node.token_stop = token_stop;
        node.char_start = char_start;
        node.char_stop = char_stop;
        node.line = line;
        node.column = column;
    }
}
