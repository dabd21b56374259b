use crate::actions::Builder;
use crate::ast::{BoolOpKind, CmpOp, NodeKind, Operator, UnaryOpKind};
use crate::diagnostics::{Diagnostic, Span};
use crate::errors::{ErrorPolicy, ParseError};
use crate::literals::SourceEncoding;
use crate::token::{Channel, TokKind, Token};
use crate::tree::{Arena, NodeId};

/// Recursive-descent parser over the indentation-filtered token stream,
/// one method per grammar production. Node construction and error routing
/// are delegated to the action `Builder`; in fail-fast mode any error
/// propagates out as `Err`, in recording mode the stream is resynchronized
/// to a statement boundary and a typed error node takes the place of the
/// missing construct.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    builder: Builder,
    recovering: bool,
}

impl Parser {
    /// Hidden-channel tokens carry no grammar; they are dropped here so
    /// node token indices refer to the stream the parser actually walked.
    pub fn new(path: &str, tokens: Vec<Token>, policy: ErrorPolicy, encoding: SourceEncoding) -> Parser {
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| token.channel == Channel::Normal)
            .collect();
        Parser {
            tokens,
            pos: 0,
            builder: Builder::new(path, policy, encoding),
            recovering: false,
        }
    }

    pub fn into_parts(self) -> (Arena, Vec<Token>, Vec<Diagnostic>) {
        (self.builder.arena, self.tokens, self.builder.diagnostics)
    }

    /// file_input: (NEWLINE | stmt)* ENDMARKER
    pub fn parse_module(&mut self) -> Result<NodeId, ParseError> {
        let module = self.builder.arena.add(NodeKind::Module);
        let first = self.pos;
        let mut children: Vec<NodeId> = Vec::new();
        loop {
            match self.peek_kind() {
                None | Some(TokKind::EndMarker) => break,
                Some(TokKind::Newline) => self.pos += 1,
                _ => {
                    let start = self.pos;
                    let group = self.parse_statement()?;
                    children.extend(group);
                    if self.pos == start {
                        // A statement that consumed nothing would loop forever.
                        self.pos += 1;
                    }
                }
            }
        }
        self.builder.arena.splice_children(module, &children);
        if children.is_empty() {
            self.stamp_empty(module);
        } else {
            self.stamp(module, first);
        }
        Ok(module)
    }

    /// stmt: simple_stmt | compound_stmt. Simple statements come back as a
    /// sibling group (one node per semicolon-separated small statement).
    fn parse_statement(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.recovering = false;
        if self.check_keyword("if") {
            return Ok(vec![self.parse_if_stmt()?]);
        }
        if self.check_keyword("while") {
            return Ok(vec![self.parse_while_stmt()?]);
        }
        if self.check_keyword("for") {
            return Ok(vec![self.parse_for_stmt()?]);
        }
        if self.check_keyword("def") {
            return Ok(vec![self.parse_funcdef()?]);
        }
        if self.check_keyword("class") {
            return Ok(vec![self.parse_classdef()?]);
        }
        if self.check(TokKind::Indent) {
            let first = self.pos;
            let span = self.here();
            self.builder.report("E1505", "unexpected indent", span)?;
            self.skip_block();
            let node = self.builder.error_stmt();
            return Ok(vec![self.stamp(node, first)]);
        }
        self.parse_simple_line()
    }

    /// simple_stmt: small_stmt (';' small_stmt)* [';'] NEWLINE
    fn parse_simple_line(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut group = vec![self.parse_small_stmt()?];
        while self.consume_symbol(";") {
            if self.check(TokKind::Newline) || self.check(TokKind::Dedent) || self.at_end() {
                break;
            }
            group.push(self.parse_small_stmt()?);
        }
        self.expect_newline()?;
        Ok(group)
    }

    fn parse_small_stmt(&mut self) -> Result<NodeId, ParseError> {
        if self.check_keyword("print") {
            return self.parse_print_stmt();
        }
        if self.check_keyword("del") {
            return self.parse_del_stmt();
        }
        if self.check_keyword("pass") {
            return self.parse_marker_stmt(NodeKind::Pass);
        }
        if self.check_keyword("break") {
            return self.parse_marker_stmt(NodeKind::Break);
        }
        if self.check_keyword("continue") {
            return self.parse_marker_stmt(NodeKind::Continue);
        }
        if self.check_keyword("return") {
            return self.parse_return_stmt();
        }
        if self.check_keyword("global") {
            return self.parse_global_stmt();
        }
        if self.check_keyword("yield") {
            let first = self.pos;
            let value = self.parse_yield_expr()?;
            let node = self.builder.arena.add(NodeKind::ExprStmt);
            self.builder.arena.push_child(node, value);
            return Ok(self.stamp(node, first));
        }
        self.parse_expr_stmt()
    }

    fn parse_marker_stmt(&mut self, kind: NodeKind) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let node = self.builder.arena.add(kind);
        Ok(self.stamp(node, first))
    }

    /// expr_stmt: testlist (augassign (yield_expr|testlist) |
    ///                      ('=' (yield_expr|testlist))*)
    fn parse_expr_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let head = self.parse_testlist()?;
        if self.pos == first && matches!(self.builder.arena.kind(head), NodeKind::ErrorExpr) {
            // Nothing at this position starts a statement; the enclosing
            // line driver resynchronizes.
            let node = self.builder.error_stmt();
            self.stamp_empty(node);
            return Ok(node);
        }
        if let Some(op) = self.peek_aug_op() {
            self.pos += 1;
            let value = self.parse_assign_value()?;
            let node = self.builder.aug_assign(op, head, value)?;
            return Ok(self.stamp(node, first));
        }
        if self.consume_symbol("=") {
            let mut targets = vec![head];
            let mut value = self.parse_assign_value()?;
            while self.consume_symbol("=") {
                targets.push(value);
                value = self.parse_assign_value()?;
            }
            let node = self.builder.assign(targets, value)?;
            return Ok(self.stamp(node, first));
        }
        let node = self.builder.arena.add(NodeKind::ExprStmt);
        self.builder.arena.push_child(node, head);
        Ok(self.stamp(node, first))
    }

    fn parse_assign_value(&mut self) -> Result<NodeId, ParseError> {
        if self.check_keyword("yield") {
            self.parse_yield_expr()
        } else {
            self.parse_testlist()
        }
    }

    /// print_stmt: 'print' ([test (',' test)* [',']] |
    ///                      '>>' test [(',' test)+ [',']])
    fn parse_print_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let mut dest = None;
        let mut values = Vec::new();
        let mut trailing_comma = false;
        if self.consume_symbol(">>") {
            dest = Some(self.parse_test()?);
            if self.consume_symbol(",") {
                loop {
                    values.push(self.parse_test()?);
                    if !self.consume_symbol(",") {
                        break;
                    }
                    if !self.at_expression_start() {
                        trailing_comma = true;
                        break;
                    }
                }
            }
        } else if self.at_expression_start() {
            loop {
                values.push(self.parse_test()?);
                if !self.consume_symbol(",") {
                    break;
                }
                if !self.at_expression_start() {
                    trailing_comma = true;
                    break;
                }
            }
        }
        let node = self.builder.print_stmt(dest, values, trailing_comma);
        Ok(self.stamp(node, first))
    }

    /// del_stmt: 'del' exprlist
    fn parse_del_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let (targets, _) = self.parse_exprlist()?;
        let node = self.builder.del_stmt(targets)?;
        Ok(self.stamp(node, first))
    }

    /// return_stmt: 'return' [testlist]
    fn parse_return_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let value = if self.at_expression_start() {
            Some(self.parse_testlist()?)
        } else {
            None
        };
        let node = self.builder.arena.add(NodeKind::Return {
            has_value: value.is_some(),
        });
        if let Some(value) = value {
            self.builder.arena.push_child(node, value);
        }
        Ok(self.stamp(node, first))
    }

    /// global_stmt: 'global' NAME (',' NAME)*
    fn parse_global_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let mut names = Vec::new();
        loop {
            match self.consume_name_text() {
                Some(name) => names.push(name),
                None => {
                    let span = self.here();
                    self.builder
                        .report("E1500", "expected name in global statement", span)?;
                    self.recovering = true;
                    break;
                }
            }
            if !self.consume_symbol(",") {
                break;
            }
        }
        let node = self.builder.arena.add(NodeKind::Global { names });
        Ok(self.stamp(node, first))
    }

    /// if_stmt: 'if' test ':' suite ('elif' test ':' suite)*
    ///          ['else' ':' suite]
    ///
    /// An `elif` arm parses as a nested `If` in the else slot.
    fn parse_if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1; // 'if' or 'elif'
        let test = self.parse_test()?;
        self.expect_symbol(":", "expected ':' after condition")?;
        let body = self.parse_suite()?;
        let node = self.builder.arena.add(NodeKind::If);
        self.builder.arena.push_child(node, test);
        self.builder.arena.push_child(node, body);
        if self.check_keyword("elif") {
            let nested = self.parse_if_stmt()?;
            self.builder.arena.push_child(node, nested);
        } else if self.match_keyword("else") {
            self.expect_symbol(":", "expected ':' after 'else'")?;
            let orelse = self.parse_suite()?;
            self.builder.arena.push_child(node, orelse);
        }
        Ok(self.stamp(node, first))
    }

    /// while_stmt: 'while' test ':' suite ['else' ':' suite]
    fn parse_while_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let test = self.parse_test()?;
        self.expect_symbol(":", "expected ':' after condition")?;
        let body = self.parse_suite()?;
        let node = self.builder.arena.add(NodeKind::While);
        self.builder.arena.push_child(node, test);
        self.builder.arena.push_child(node, body);
        if self.match_keyword("else") {
            self.expect_symbol(":", "expected ':' after 'else'")?;
            let orelse = self.parse_suite()?;
            self.builder.arena.push_child(node, orelse);
        }
        Ok(self.stamp(node, first))
    }

    /// for_stmt: 'for' exprlist 'in' testlist ':' suite ['else' ':' suite]
    fn parse_for_stmt(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let target = self.parse_target_list()?;
        self.builder.check_assign(target)?;
        self.expect_keyword("in", "expected 'in' in for statement")?;
        let iter = self.parse_testlist()?;
        self.expect_symbol(":", "expected ':' after for header")?;
        let body = self.parse_suite()?;
        let node = self.builder.arena.add(NodeKind::For);
        self.builder.arena.push_child(node, target);
        self.builder.arena.push_child(node, iter);
        self.builder.arena.push_child(node, body);
        if self.match_keyword("else") {
            self.expect_symbol(":", "expected ':' after 'else'")?;
            let orelse = self.parse_suite()?;
            self.builder.arena.push_child(node, orelse);
        }
        Ok(self.stamp(node, first))
    }

    /// funcdef: 'def' NAME '(' [varargslist] ')' ':' suite
    fn parse_funcdef(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let Some(name) = self.consume_name_text() else {
            return self.malformed_stmt(first, "expected function name after 'def'");
        };
        self.expect_symbol("(", "expected '(' after function name")?;
        let params = self.parse_param_list()?;
        self.expect_symbol(")", "expected ')' after parameters")?;
        self.expect_symbol(":", "expected ':' after function header")?;
        let body = self.parse_suite()?;
        let node = self.builder.arena.add(NodeKind::FunctionDef { name });
        self.builder.arena.push_child(node, params);
        self.builder.arena.push_child(node, body);
        Ok(self.stamp(node, first))
    }

    /// classdef: 'class' NAME ['(' testlist ')'] ':' suite
    fn parse_classdef(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let Some(name) = self.consume_name_text() else {
            return self.malformed_stmt(first, "expected class name after 'class'");
        };
        let mut bases = Vec::new();
        if self.consume_symbol("(") {
            while !self.check_symbol(")") && !self.at_end() {
                bases.push(self.parse_test()?);
                if !self.consume_symbol(",") {
                    break;
                }
            }
            self.expect_symbol(")", "expected ')' after base classes")?;
        }
        self.expect_symbol(":", "expected ':' after class header")?;
        let body = self.parse_suite()?;
        let node = self.builder.arena.add(NodeKind::ClassDef { name });
        for base in bases {
            self.builder.arena.push_child(node, base);
        }
        self.builder.arena.push_child(node, body);
        Ok(self.stamp(node, first))
    }

    /// varargslist (subset): NAME ['=' test] (',' NAME ['=' test])*
    fn parse_param_list(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let node = self.builder.arena.add(NodeKind::Params);
        let mut params = Vec::new();
        while matches!(self.peek_kind(), Some(TokKind::Name)) {
            let param_first = self.pos;
            let name = match self.consume_name_text() {
                Some(name) => name,
                None => break,
            };
            let param = self.builder.arena.add(NodeKind::Param { name });
            if self.consume_symbol("=") {
                let default = self.parse_test()?;
                self.builder.arena.push_child(param, default);
            }
            self.stamp(param, param_first);
            params.push(param);
            if !self.consume_symbol(",") {
                break;
            }
        }
        self.builder.check_params(&params)?;
        self.builder.arena.splice_children(node, &params);
        if params.is_empty() {
            self.stamp_empty(node);
        } else {
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// suite: simple_stmt | NEWLINE INDENT stmt+ DEDENT
    fn parse_suite(&mut self) -> Result<NodeId, ParseError> {
        let node = self.builder.arena.add(NodeKind::Suite);
        if self.check(TokKind::Newline) {
            self.pos += 1;
            if !self.check(TokKind::Indent) {
                if !self.recovering {
                    let span = self.here();
                    self.builder.report("E1504", "expected an indented block", span)?;
                }
                self.recovering = true;
                self.stamp_empty(node);
                return Ok(node);
            }
            self.pos += 1;
            let first = self.pos;
            let mut group: Vec<NodeId> = Vec::new();
            loop {
                match self.peek_kind() {
                    None | Some(TokKind::EndMarker) => break,
                    Some(TokKind::Dedent) => {
                        self.pos += 1;
                        break;
                    }
                    Some(TokKind::Newline) => self.pos += 1,
                    _ => {
                        let start = self.pos;
                        let stmts = self.parse_statement()?;
                        group.extend(stmts);
                        if self.pos == start {
                            self.pos += 1;
                        }
                    }
                }
            }
            self.builder.arena.splice_children(node, &group);
            if group.is_empty() {
                self.stamp_empty(node);
            } else {
                self.stamp(node, first);
            }
            return Ok(node);
        }
        let first = self.pos;
        let group = self.parse_simple_line()?;
        self.builder.arena.splice_children(node, &group);
        if group.is_empty() {
            self.stamp_empty(node);
        } else {
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// yield_expr: 'yield' [testlist]
    fn parse_yield_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let value = if self.at_expression_start() {
            Some(self.parse_testlist()?)
        } else {
            None
        };
        let node = self.builder.arena.add(NodeKind::YieldExpr {
            has_value: value.is_some(),
        });
        if let Some(value) = value {
            self.builder.arena.push_child(node, value);
        }
        Ok(self.stamp(node, first))
    }

    /// testlist: test (',' test)* [','] with tuple building.
    fn parse_testlist(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let head = self.parse_test()?;
        if !self.check_symbol(",") {
            return Ok(head);
        }
        let mut items = vec![head];
        while self.consume_symbol(",") {
            if !self.at_expression_start() {
                break;
            }
            items.push(self.parse_test()?);
        }
        let node = self.builder.arena.add(NodeKind::Tuple);
        for item in items {
            self.builder.arena.push_child(node, item);
        }
        Ok(self.stamp(node, first))
    }

    /// exprlist: expr (',' expr)* [','], kept flat for del targets.
    fn parse_exprlist(&mut self) -> Result<(Vec<NodeId>, bool), ParseError> {
        let mut items = vec![self.parse_expr()?];
        let mut comma = false;
        while self.consume_symbol(",") {
            comma = true;
            if !self.at_expression_start() {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok((items, comma))
    }

    /// exprlist with the single-element/trailing-comma tuple rule applied,
    /// for loop and comprehension targets.
    fn parse_target_list(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let (items, comma) = self.parse_exprlist()?;
        if items.len() == 1 && !comma {
            return Ok(items[0]);
        }
        let node = self.builder.arena.add(NodeKind::Tuple);
        for item in items {
            self.builder.arena.push_child(node, item);
        }
        Ok(self.stamp(node, first))
    }

    /// test: or_test ['if' or_test 'else' test] | lambdef
    fn parse_test(&mut self) -> Result<NodeId, ParseError> {
        if self.check_keyword("lambda") {
            return self.parse_lambda();
        }
        let first = self.pos;
        let body = self.parse_or_test()?;
        if self.match_keyword("if") {
            let test = self.parse_or_test()?;
            self.expect_keyword("else", "expected 'else' in conditional expression")?;
            let orelse = self.parse_test()?;
            let node = self.builder.arena.add(NodeKind::IfExp);
            self.builder.arena.push_child(node, body);
            self.builder.arena.push_child(node, test);
            self.builder.arena.push_child(node, orelse);
            return Ok(self.stamp(node, first));
        }
        Ok(body)
    }

    /// lambdef: 'lambda' [varargslist] ':' test
    fn parse_lambda(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1;
        let params = self.parse_param_list()?;
        self.expect_symbol(":", "expected ':' after lambda parameters")?;
        let body = self.parse_test()?;
        let node = self.builder.arena.add(NodeKind::Lambda);
        self.builder.arena.push_child(node, params);
        self.builder.arena.push_child(node, body);
        Ok(self.stamp(node, first))
    }

    /// or_test: and_test ('or' and_test)*
    fn parse_or_test(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_and_test()?;
        while self.match_keyword("or") {
            let right = self.parse_and_test()?;
            node = self.builder.bool_op(BoolOpKind::Or, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// and_test: not_test ('and' not_test)*
    fn parse_and_test(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_not_test()?;
        while self.match_keyword("and") {
            let right = self.parse_not_test()?;
            node = self.builder.bool_op(BoolOpKind::And, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// not_test: 'not' not_test | comparison
    fn parse_not_test(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        if self.match_keyword("not") {
            let operand = self.parse_not_test()?;
            let node = self.builder.unary_op(UnaryOpKind::Not, operand);
            return Ok(self.stamp(node, first));
        }
        self.parse_comparison()
    }

    /// comparison: expr (comp_op expr)*
    fn parse_comparison(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_expr()?;
        while let Some(op) = self.match_comp_op() {
            let right = self.parse_expr()?;
            node = self.builder.compare(node, op, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    fn match_comp_op(&mut self) -> Option<CmpOp> {
        let token = self.peek()?;
        match (token.kind, token.text.as_str()) {
            (TokKind::Symbol, "<") => {
                self.pos += 1;
                Some(CmpOp::Lt)
            }
            (TokKind::Symbol, ">") => {
                self.pos += 1;
                Some(CmpOp::Gt)
            }
            (TokKind::Symbol, "==") => {
                self.pos += 1;
                Some(CmpOp::Eq)
            }
            (TokKind::Symbol, "<=") => {
                self.pos += 1;
                Some(CmpOp::LtE)
            }
            (TokKind::Symbol, ">=") => {
                self.pos += 1;
                Some(CmpOp::GtE)
            }
            (TokKind::Symbol, "!=") | (TokKind::Symbol, "<>") => {
                self.pos += 1;
                Some(CmpOp::NotEq)
            }
            (TokKind::Keyword, "in") => {
                self.pos += 1;
                Some(CmpOp::In)
            }
            (TokKind::Keyword, "is") => {
                self.pos += 1;
                if self.match_keyword("not") {
                    Some(CmpOp::IsNot)
                } else {
                    Some(CmpOp::Is)
                }
            }
            (TokKind::Keyword, "not") => {
                let next_is_in = matches!(
                    self.tokens.get(self.pos + 1),
                    Some(next) if next.is_keyword("in")
                );
                if next_is_in {
                    self.pos += 2;
                    Some(CmpOp::NotIn)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// expr: xor_expr ('|' xor_expr)*
    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_xor_expr()?;
        while let Some(op) = self.match_binary_op(&["|"]) {
            let right = self.parse_xor_expr()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// xor_expr: and_expr ('^' and_expr)*
    fn parse_xor_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_and_expr()?;
        while let Some(op) = self.match_binary_op(&["^"]) {
            let right = self.parse_and_expr()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// and_expr: shift_expr ('&' shift_expr)*
    fn parse_and_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_shift_expr()?;
        while let Some(op) = self.match_binary_op(&["&"]) {
            let right = self.parse_shift_expr()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// shift_expr: arith_expr (('<<'|'>>') arith_expr)*
    fn parse_shift_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_arith_expr()?;
        while let Some(op) = self.match_binary_op(&["<<", ">>"]) {
            let right = self.parse_arith_expr()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// arith_expr: term (('+'|'-') term)*
    fn parse_arith_expr(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_term()?;
        while let Some(op) = self.match_binary_op(&["+", "-"]) {
            let right = self.parse_term()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// term: factor (('*'|'/'|'%'|'//') factor)*
    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let mut node = self.parse_factor()?;
        while let Some(op) = self.match_binary_op(&["*", "/", "%", "//"]) {
            let right = self.parse_factor()?;
            node = self.builder.bin_op(op, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    fn match_binary_op(&mut self, symbols: &[&str]) -> Option<Operator> {
        let token = self.peek()?;
        if token.kind != TokKind::Symbol || !symbols.contains(&token.text.as_str()) {
            return None;
        }
        let op = Operator::from_symbol(&token.text)?;
        self.pos += 1;
        Some(op)
    }

    /// factor: ('+'|'-'|'~') factor | power
    fn parse_factor(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let op = match self.peek() {
            Some(token) if token.kind == TokKind::Symbol => match token.text.as_str() {
                "+" => Some(UnaryOpKind::UAdd),
                "-" => Some(UnaryOpKind::USub),
                "~" => Some(UnaryOpKind::Invert),
                _ => None,
            },
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.parse_factor()?;
            let node = self.builder.unary_op(op, operand);
            return Ok(self.stamp(node, first));
        }
        self.parse_power()
    }

    /// power: atom trailer* ['**' factor]
    fn parse_power(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let atom = self.parse_atom()?;
        let mut node = self.parse_trailers(atom, first)?;
        if self.consume_symbol("**") {
            let right = self.parse_factor()?;
            node = self.builder.bin_op(Operator::Pow, node, right);
            self.stamp(node, first);
        }
        Ok(node)
    }

    /// trailer: '(' [arglist] ')' | '[' subscriptlist ']' | '.' NAME
    fn parse_trailers(&mut self, mut node: NodeId, first: usize) -> Result<NodeId, ParseError> {
        loop {
            if self.check_symbol("(") {
                node = self.parse_call_trailer(node)?;
                self.stamp(node, first);
            } else if self.consume_symbol("[") {
                let slice = self.parse_subscript_list()?;
                self.expect_symbol("]", "expected ']' to close subscript")?;
                node = self.builder.subscript(node, slice);
                self.stamp(node, first);
            } else if self.check_symbol(".") {
                self.pos += 1;
                match self.consume_name_text() {
                    Some(attr) => {
                        node = self.builder.attribute(node, &attr);
                        self.stamp(node, first);
                    }
                    None => {
                        let span = self.here();
                        self.builder
                            .report("E1500", "expected attribute name after '.'", span)?;
                        self.recovering = true;
                        break;
                    }
                }
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// arglist: positional and keyword arguments, then '*' and '**'
    /// unpacking; a lone argument followed by 'for' is a generator
    /// expression argument.
    fn parse_call_trailer(&mut self, func: NodeId) -> Result<NodeId, ParseError> {
        self.pos += 1; // '('
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Span, NodeId)> = Vec::new();
        let mut star = None;
        let mut dstar = None;
        while !self.check_symbol(")") && !self.at_end() {
            if self.consume_symbol("**") {
                dstar = Some(self.parse_test()?);
            } else if self.consume_symbol("*") {
                if dstar.is_some() {
                    let span = self.here();
                    self.builder
                        .report("E1503", "argument follows star arguments", span)?;
                    self.recovering = true;
                }
                star = Some(self.parse_test()?);
            } else if let Some((name, span)) = self.peek_keyword_argument() {
                if star.is_some() || dstar.is_some() {
                    self.builder
                        .report("E1503", "argument follows star arguments", span)?;
                    self.recovering = true;
                }
                self.pos += 2; // NAME '='
                let value = self.parse_test()?;
                keywords.push((name, span, value));
            } else {
                let span = self.here();
                if star.is_some() || dstar.is_some() {
                    self.builder
                        .report("E1503", "argument follows star arguments", span)?;
                    self.recovering = true;
                } else if !keywords.is_empty() {
                    self.builder.report(
                        "E1503",
                        "non-keyword argument after keyword argument",
                        span,
                    )?;
                    self.recovering = true;
                }
                let value = self.parse_test()?;
                if args.is_empty()
                    && keywords.is_empty()
                    && star.is_none()
                    && dstar.is_none()
                    && self.check_keyword("for")
                {
                    let gen = self.parse_comprehension_tail(value, NodeKind::GeneratorExp)?;
                    self.expect_symbol(")", "expected ')' to close call")?;
                    return self.builder.call(func, vec![gen], Vec::new(), None, None);
                }
                args.push(value);
            }
            if !self.consume_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")", "expected ')' to close call")?;
        self.builder.call(func, args, keywords, star, dstar)
    }

    fn peek_keyword_argument(&self) -> Option<(String, Span)> {
        let token = self.tokens.get(self.pos)?;
        if token.kind != TokKind::Name {
            return None;
        }
        let next = self.tokens.get(self.pos + 1)?;
        if next.is_symbol("=") {
            Some((token.text.clone(), token.span()))
        } else {
            None
        }
    }

    /// subscriptlist: subscript (',' subscript)* [',']
    fn parse_subscript_list(&mut self) -> Result<NodeId, ParseError> {
        let mut items = vec![self.parse_subscript_item()?];
        let mut trailing_comma = false;
        while self.consume_symbol(",") {
            if self.check_symbol("]") || self.at_end() {
                trailing_comma = true;
                break;
            }
            items.push(self.parse_subscript_item()?);
        }
        Ok(self.builder.combine_subscripts(items, trailing_comma))
    }

    /// subscript: '...' | test | [test] ':' [test] [':' [test]]
    fn parse_subscript_item(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        if self.consume_symbol("...") {
            let node = self.builder.ellipsis_item();
            return Ok(self.stamp(node, first));
        }
        if !self.check_symbol(":") && !self.at_expression_start() {
            let span = self.here();
            self.builder.report("E1500", "expected subscript", span)?;
            self.recovering = true;
            let node = self.builder.error_slice();
            self.stamp_empty(node);
            return Ok(node);
        }
        if !self.check_symbol(":") {
            let value = self.parse_test()?;
            if !self.check_symbol(":") {
                let node = self.builder.index_item(value);
                return Ok(self.stamp(node, first));
            }
            self.pos += 1; // ':'
            return self.parse_slice_tail(first, Some(value));
        }
        self.pos += 1; // ':'
        self.parse_slice_tail(first, None)
    }

    /// sliceop tail after the first ':' of a slice.
    fn parse_slice_tail(&mut self, first: usize, lower: Option<NodeId>) -> Result<NodeId, ParseError> {
        let mut upper = None;
        if self.at_expression_start() {
            upper = Some(self.parse_test()?);
        }
        let mut step = None;
        if self.consume_symbol(":") && self.at_expression_start() {
            step = Some(self.parse_test()?);
        }
        let node = self.builder.slice_item(lower, upper, step);
        Ok(self.stamp(node, first))
    }

    /// atom: '(' ... ')' | '[' ... ']' | '{' ... '}' | '`' testlist1 '`'
    ///     | NAME | NUMBER | STRING+
    fn parse_atom(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        let Some(token) = self.peek().cloned() else {
            return self.failed_expr("expected expression");
        };
        match token.kind {
            TokKind::Name => {
                self.pos += 1;
                let node = self.builder.name(&token.text);
                Ok(self.stamp(node, first))
            }
            TokKind::Number => {
                self.pos += 1;
                let node = self.builder.num_literal(&token.text, token.span())?;
                Ok(self.stamp(node, first))
            }
            TokKind::Str => {
                let mut parts = Vec::new();
                while let Some(part) = self.peek() {
                    if part.kind != TokKind::Str {
                        break;
                    }
                    parts.push((part.text.clone(), part.span()));
                    self.pos += 1;
                }
                let node = self.builder.str_literal(&parts)?;
                Ok(self.stamp(node, first))
            }
            TokKind::Symbol => match token.text.as_str() {
                "(" => self.parse_paren_atom(),
                "[" => self.parse_list_atom(),
                "{" => self.parse_dict_atom(),
                "`" => self.parse_repr_atom(),
                _ => self.failed_expr(&format!("unexpected '{}'", token.text)),
            },
            TokKind::Keyword => self.failed_expr(&format!("unexpected keyword '{}'", token.text)),
            _ => self.failed_expr(&format!("expected expression, found {}", self.describe_current())),
        }
    }

    /// '(' [yield_expr | testlist_gexp] ')'
    fn parse_paren_atom(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1; // '('
        if self.consume_symbol(")") {
            let node = self.builder.arena.add(NodeKind::Tuple);
            self.builder.arena.set_parenthesized(node);
            return Ok(self.stamp(node, first));
        }
        if self.check_keyword("yield") {
            let node = self.parse_yield_expr()?;
            self.expect_symbol(")", "expected ')' after yield expression")?;
            self.builder.arena.set_parenthesized(node);
            return Ok(node);
        }
        let head = self.parse_test()?;
        if self.check_keyword("for") {
            let node = self.parse_comprehension_tail(head, NodeKind::GeneratorExp)?;
            self.expect_symbol(")", "expected ')' after generator expression")?;
            self.builder.arena.set_parenthesized(node);
            return Ok(self.stamp(node, first));
        }
        if self.check_symbol(",") {
            let mut items = vec![head];
            while self.consume_symbol(",") {
                if !self.at_expression_start() {
                    break;
                }
                items.push(self.parse_test()?);
            }
            self.expect_symbol(")", "expected ')' to close tuple")?;
            let node = self.builder.arena.add(NodeKind::Tuple);
            for item in items {
                self.builder.arena.push_child(node, item);
            }
            self.builder.arena.set_parenthesized(node);
            return Ok(self.stamp(node, first));
        }
        self.expect_symbol(")", "expected ')'")?;
        self.builder.arena.set_parenthesized(head);
        Ok(head)
    }

    /// '[' [listmaker] ']'
    fn parse_list_atom(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1; // '['
        if self.consume_symbol("]") {
            let node = self.builder.arena.add(NodeKind::List);
            return Ok(self.stamp(node, first));
        }
        let head = self.parse_test()?;
        if self.check_keyword("for") {
            let node = self.parse_comprehension_tail(head, NodeKind::ListComp)?;
            self.expect_symbol("]", "expected ']' to close list comprehension")?;
            return Ok(self.stamp(node, first));
        }
        let mut items = vec![head];
        while self.consume_symbol(",") {
            if !self.at_expression_start() {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect_symbol("]", "expected ']' to close list display")?;
        let node = self.builder.arena.add(NodeKind::List);
        for item in items {
            self.builder.arena.push_child(node, item);
        }
        Ok(self.stamp(node, first))
    }

    /// '{' [dictmaker] '}'; children alternate key, value.
    fn parse_dict_atom(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1; // '{'
        let node = self.builder.arena.add(NodeKind::Dict);
        if self.consume_symbol("}") {
            return Ok(self.stamp(node, first));
        }
        loop {
            let key = self.parse_test()?;
            self.expect_symbol(":", "expected ':' in dict display")?;
            let value = self.parse_test()?;
            self.builder.arena.push_child(node, key);
            self.builder.arena.push_child(node, value);
            if !self.consume_symbol(",") {
                break;
            }
            if self.check_symbol("}") {
                break;
            }
        }
        self.expect_symbol("}", "expected '}' to close dict display")?;
        Ok(self.stamp(node, first))
    }

    /// '`' testlist1 '`'
    fn parse_repr_atom(&mut self) -> Result<NodeId, ParseError> {
        let first = self.pos;
        self.pos += 1; // '`'
        let content_first = self.pos;
        let head = self.parse_test()?;
        let value = if self.check_symbol(",") {
            let mut items = vec![head];
            while self.consume_symbol(",") {
                if !self.at_expression_start() {
                    break;
                }
                items.push(self.parse_test()?);
            }
            let tuple = self.builder.arena.add(NodeKind::Tuple);
            for item in items {
                self.builder.arena.push_child(tuple, item);
            }
            self.stamp(tuple, content_first)
        } else {
            head
        };
        self.expect_symbol("`", "expected closing '`'")?;
        let node = self.builder.arena.add(NodeKind::Repr);
        self.builder.arena.push_child(node, value);
        Ok(self.stamp(node, first))
    }

    /// comp_for: 'for' exprlist 'in' or_test ('if' or_test)*, repeated.
    fn parse_comprehension_tail(&mut self, elt: NodeId, kind: NodeKind) -> Result<NodeId, ParseError> {
        let first = self.builder.arena.node(elt).token_start;
        let node = self.builder.arena.add(kind);
        self.builder.arena.push_child(node, elt);
        while self.check_keyword("for") {
            let clause_first = self.pos;
            self.pos += 1;
            let target = self.parse_target_list()?;
            self.expect_keyword("in", "expected 'in' in comprehension")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.match_keyword("if") {
                ifs.push(self.parse_or_test()?);
            }
            let clause = self.builder.comprehension(target, iter, ifs)?;
            self.stamp(clause, clause_first);
            self.builder.arena.push_child(node, clause);
        }
        Ok(self.stamp(node, first))
    }

    // Token cursor helpers.

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokKind> {
        self.tokens.get(self.pos).map(|token| token.kind)
    }

    fn check(&self, kind: TokKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(token) if token.is_symbol(symbol))
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(token) if token.is_keyword(keyword))
    }

    fn consume_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn consume_name_text(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos)?;
        if token.kind != TokKind::Name {
            return None;
        }
        let text = token.text.clone();
        self.pos += 1;
        Some(text)
    }

    fn expect_symbol(&mut self, symbol: &str, message: &str) -> Result<(), ParseError> {
        if self.consume_symbol(symbol) {
            return Ok(());
        }
        let span = self.here();
        self.builder.report("E1500", message, span)?;
        self.recovering = true;
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: &str, message: &str) -> Result<(), ParseError> {
        if self.match_keyword(keyword) {
            return Ok(());
        }
        let span = self.here();
        self.builder.report("E1500", message, span)?;
        self.recovering = true;
        Ok(())
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        if self.check(TokKind::Newline) {
            self.pos += 1;
            return Ok(());
        }
        if matches!(
            self.peek_kind(),
            None | Some(TokKind::EndMarker) | Some(TokKind::Dedent)
        ) {
            return Ok(());
        }
        if !self.recovering {
            let found = self.describe_current();
            let span = self.here();
            self.builder
                .report("E1500", format!("expected end of line, found {found}"), span)?;
        }
        self.recover_statement();
        Ok(())
    }

    fn peek_aug_op(&self) -> Option<Operator> {
        let token = self.peek()?;
        if token.kind != TokKind::Symbol {
            return None;
        }
        Operator::from_augmented(&token.text)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokKind::EndMarker))
    }

    /// Whether the current token can open an expression.
    fn at_expression_start(&self) -> bool {
        match self.peek() {
            None => false,
            Some(token) => match token.kind {
                TokKind::Name | TokKind::Number | TokKind::Str => true,
                TokKind::Symbol => {
                    matches!(token.text.as_str(), "(" | "[" | "{" | "`" | "+" | "-" | "~")
                }
                TokKind::Keyword => matches!(token.text.as_str(), "lambda" | "not"),
                _ => false,
            },
        }
    }

    fn here(&self) -> Span {
        if let Some(token) = self.tokens.get(self.pos) {
            return token.span();
        }
        match self.tokens.last() {
            Some(token) => token.span(),
            None => Span::point(1, 1),
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of file".to_string(),
            Some(token) => match token.kind {
                TokKind::Name => format!("name '{}'", token.text),
                TokKind::Keyword | TokKind::Symbol => format!("'{}'", token.text),
                TokKind::Number => "number literal".to_string(),
                TokKind::Str => "string literal".to_string(),
                TokKind::Newline => "end of line".to_string(),
                TokKind::Indent => "indent".to_string(),
                TokKind::Dedent => "end of block".to_string(),
                TokKind::EndMarker => "end of file".to_string(),
                TokKind::LeadingWs | TokKind::Comment => "whitespace".to_string(),
            },
        }
    }

    // Error-node production and resynchronization.

    fn failed_expr(&mut self, message: &str) -> Result<NodeId, ParseError> {
        let span = self.here();
        self.builder.report("E1500", message, span)?;
        self.recovering = true;
        let node = self.builder.error_expr();
        self.stamp_empty(node);
        Ok(node)
    }

    fn malformed_stmt(&mut self, first: usize, message: &str) -> Result<NodeId, ParseError> {
        let span = self.here();
        self.builder.report("E1500", message, span)?;
        self.recovering = true;
        let node = self.builder.error_stmt();
        self.recover_statement();
        if self.pos > first {
            self.stamp(node, first);
        } else {
            self.stamp_empty(node);
        }
        Ok(node)
    }

    /// Skips forward to the next statement boundary: past the next
    /// newline (and any block it opens), or up to a dedent/end marker.
    fn recover_statement(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokKind::Newline => {
                    self.pos += 1;
                    if self.check(TokKind::Indent) {
                        self.skip_block();
                    }
                    return;
                }
                TokKind::Dedent | TokKind::EndMarker => return,
                _ => self.pos += 1,
            }
        }
    }

    /// Skips one balanced INDENT..DEDENT block, current token included.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokKind::Indent => depth += 1,
                TokKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                TokKind::EndMarker => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    // Source-extent bookkeeping.

    /// Stamps `node` as covering tokens `first..` up to the last
    /// content token consumed so far.
    fn stamp(&mut self, node: NodeId, first: usize) -> NodeId {
        let last = self.last_content_before_pos(first);
        self.builder.arena.set_boundaries(node, first, last, &self.tokens);
        node
    }

    /// Stamps `node` as covering no tokens, anchored at the current one.
    fn stamp_empty(&mut self, node: NodeId) {
        if self.pos == 0 {
            if let Some(token) = self.tokens.first() {
                let stored = self.builder.arena.node_mut(node);
                stored.line = token.line;
                stored.column = token.column;
                stored.char_start = token.start;
                stored.char_stop = token.start;
            }
            return;
        }
        self.builder
            .arena
            .set_boundaries(node, self.pos, self.pos - 1, &self.tokens);
    }

    /// Index of the last non-synthesized token before the cursor, not
    /// reaching back past `not_before`.
    fn last_content_before_pos(&self, not_before: usize) -> usize {
        let mut index = self.pos.min(self.tokens.len());
        while index > not_before {
            match self.tokens[index - 1].kind {
                TokKind::Newline | TokKind::Indent | TokKind::Dedent | TokKind::EndMarker => {
                    index -= 1;
                }
                _ => return index - 1,
            }
        }
        not_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indent::filter_tokens;
    use crate::lexer::lex;

    fn parse(source: &str, policy: ErrorPolicy) -> (Arena, NodeId, Vec<Diagnostic>) {
        let (raw, lex_diags) = lex(source);
        assert!(lex_diags.is_empty(), "lexer diagnostics: {lex_diags:?}");
        let tokens = filter_tokens(raw, "test.py").expect("indentation");
        let mut parser = Parser::new("test.py", tokens, policy, SourceEncoding::Utf8);
        let root = parser.parse_module().expect("parse");
        let (arena, _, diagnostics) = parser.into_parts();
        (arena, root, diagnostics)
    }

    fn tree(source: &str) -> String {
        let (arena, root, diagnostics) = parse(source, ErrorPolicy::FailFast);
        assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");
        arena.dump(root)
    }

    #[test]
    fn assignment_chain_keeps_targets_in_order() {
        assert_eq!(tree("a = b = 1\n"), "Module(Assign(Name(a), Name(b), Num(1)))");
    }

    #[test]
    fn augmented_assignment_carries_its_operator() {
        assert_eq!(tree("x += 1\n"), "Module(AugAssign[Add](Name(x), Num(1)))");
        assert_eq!(tree("x //= 2\n"), "Module(AugAssign[FloorDiv](Name(x), Num(2)))");
    }

    #[test]
    fn semicolons_make_sibling_statements() {
        assert_eq!(
            tree("a = 1; b = 2\n"),
            "Module(Assign(Name(a), Num(1)), Assign(Name(b), Num(2)))"
        );
    }

    #[test]
    fn print_forms() {
        assert_eq!(tree("print\n"), "Module(Print)");
        assert_eq!(tree("print 1, 2\n"), "Module(Print(Num(1), Num(2)))");
        assert_eq!(tree("print 1,\n"), "Module(Print[nonl](Num(1)))");
        assert_eq!(
            tree("print >>log, x\n"),
            "Module(Print[dest](Name(log), Name(x)))"
        );
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            tree("1 + 2 * 3\n"),
            "Module(ExprStmt(BinOp[Add](Num(1), BinOp[Mult](Num(2), Num(3)))))"
        );
        assert_eq!(
            tree("2 ** 3 ** 2\n"),
            "Module(ExprStmt(BinOp[Pow](Num(2), BinOp[Pow](Num(3), Num(2)))))"
        );
        assert_eq!(
            tree("1 | 2 & 3\n"),
            "Module(ExprStmt(BinOp[BitOr](Num(1), BinOp[BitAnd](Num(2), Num(3)))))"
        );
    }

    #[test]
    fn boolean_chains_flatten_unless_parenthesized() {
        assert_eq!(
            tree("a and b and c\n"),
            "Module(ExprStmt(BoolOp[And](Name(a), Name(b), Name(c))))"
        );
        assert_eq!(
            tree("a and (b and c)\n"),
            "Module(ExprStmt(BoolOp[And](Name(a), BoolOp[And](Name(b), Name(c)))))"
        );
    }

    #[test]
    fn comparison_chains_fold() {
        assert_eq!(
            tree("a < b < c\n"),
            "Module(ExprStmt(Compare[Lt,Lt](Name(a), Name(b), Name(c))))"
        );
        assert_eq!(
            tree("a is not b\n"),
            "Module(ExprStmt(Compare[IsNot](Name(a), Name(b))))"
        );
        assert_eq!(
            tree("a not in b\n"),
            "Module(ExprStmt(Compare[NotIn](Name(a), Name(b))))"
        );
        assert_eq!(
            tree("a <> b\n"),
            "Module(ExprStmt(Compare[NotEq](Name(a), Name(b))))"
        );
    }

    #[test]
    fn subscript_shapes() {
        assert_eq!(
            tree("a[1]\n"),
            "Module(ExprStmt(Subscript(Name(a), Index(Num(1)))))"
        );
        assert_eq!(
            tree("a[1:2]\n"),
            "Module(ExprStmt(Subscript(Name(a), Slice(Num(1), Num(2), Name(None)))))"
        );
        assert_eq!(
            tree("a[1:2:3]\n"),
            "Module(ExprStmt(Subscript(Name(a), Slice(Num(1), Num(2), Num(3)))))"
        );
        assert_eq!(
            tree("a[1,2:3]\n"),
            "Module(ExprStmt(Subscript(Name(a), ExtSlice(Index(Num(1)), Slice(Num(2), Num(3), Name(None))))))"
        );
        assert_eq!(
            tree("a[1,2]\n"),
            "Module(ExprStmt(Subscript(Name(a), Index(Tuple(Num(1), Num(2))))))"
        );
        assert_eq!(
            tree("a[...]\n"),
            "Module(ExprStmt(Subscript(Name(a), Ellipsis)))"
        );
    }

    #[test]
    fn call_arguments_and_attribute_trailers() {
        assert_eq!(
            tree("f(1, x, key=2)\n"),
            "Module(ExprStmt(Call(Name(f), Num(1), Name(x), Keyword[key](Num(2)))))"
        );
        assert_eq!(
            tree("f(*a, **b)\n"),
            "Module(ExprStmt(Call[star,dstar](Name(f), Name(a), Name(b))))"
        );
        assert_eq!(
            tree("a.b.c\n"),
            "Module(ExprStmt(Attribute[c](Attribute[b](Name(a)))))"
        );
    }

    #[test]
    fn if_elif_else_nests_in_the_else_slot() {
        let source = "if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n";
        assert_eq!(
            tree(source),
            "Module(If(Name(a), Suite(Pass), If(Name(b), Suite(Pass), Suite(Pass))))"
        );
    }

    #[test]
    fn loops_with_else_suites() {
        assert_eq!(
            tree("while x:\n    break\nelse:\n    pass\n"),
            "Module(While(Name(x), Suite(Break), Suite(Pass)))"
        );
        assert_eq!(
            tree("for i in xs:\n    continue\nelse:\n    pass\n"),
            "Module(For(Name(i), Name(xs), Suite(Continue), Suite(Pass)))"
        );
        assert_eq!(
            tree("for k, v in items:\n    pass\n"),
            "Module(For(Tuple(Name(k), Name(v)), Name(items), Suite(Pass)))"
        );
    }

    #[test]
    fn function_and_class_definitions() {
        assert_eq!(
            tree("def f(a, b=1):\n    return a\n"),
            "Module(FunctionDef[f](Params(Param[a], Param[b](Num(1))), Suite(Return(Name(a)))))"
        );
        assert_eq!(
            tree("class C(Base):\n    pass\n"),
            "Module(ClassDef[C](Name(Base), Suite(Pass)))"
        );
        assert_eq!(
            tree("def g():\n    yield 1\n"),
            "Module(FunctionDef[g](Params, Suite(ExprStmt(YieldExpr(Num(1))))))"
        );
    }

    #[test]
    fn lambda_and_conditional_expressions() {
        assert_eq!(
            tree("f = lambda x: x\n"),
            "Module(Assign(Name(f), Lambda(Params(Param[x]), Name(x))))"
        );
        assert_eq!(
            tree("a if b else c\n"),
            "Module(ExprStmt(IfExp(Name(a), Name(b), Name(c))))"
        );
    }

    #[test]
    fn displays_and_comprehensions() {
        assert_eq!(
            tree("[x for x in xs if x > 0]\n"),
            "Module(ExprStmt(ListComp(Name(x), Comprehension(Name(x), Name(xs), Compare[Gt](Name(x), Num(0))))))"
        );
        assert_eq!(
            tree("(x for x in xs)\n"),
            "Module(ExprStmt(GeneratorExp(Name(x), Comprehension(Name(x), Name(xs)))))"
        );
        assert_eq!(
            tree("f(x for x in xs)\n"),
            "Module(ExprStmt(Call(Name(f), GeneratorExp(Name(x), Comprehension(Name(x), Name(xs))))))"
        );
        assert_eq!(
            tree("{1: 'a'}\n"),
            "Module(ExprStmt(Dict(Num(1), Str('a'))))"
        );
        assert_eq!(tree("[]\n"), "Module(ExprStmt(List))");
        assert_eq!(tree("()\n"), "Module(ExprStmt(Tuple))");
    }

    #[test]
    fn backquotes_build_repr_nodes() {
        assert_eq!(tree("`x`\n"), "Module(ExprStmt(Repr(Name(x))))");
        assert_eq!(
            tree("`x, y`\n"),
            "Module(ExprStmt(Repr(Tuple(Name(x), Name(y)))))"
        );
    }

    #[test]
    fn tuples_with_and_without_parens() {
        assert_eq!(
            tree("x = 1, 2\n"),
            "Module(Assign(Name(x), Tuple(Num(1), Num(2))))"
        );
        assert_eq!(tree("x = 1,\n"), "Module(Assign(Name(x), Tuple(Num(1))))");
        assert_eq!(
            tree("del a, b\n"),
            "Module(Del(Name(a), Name(b)))"
        );
    }

    #[test]
    fn global_names_are_payload_only() {
        assert_eq!(tree("global a, b\n"), "Module(Global[a,b])");
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert_eq!(tree("'a' 'b'\n"), "Module(ExprStmt(Str('ab')))");
        assert_eq!(tree("'a' u'b'\n"), "Module(ExprStmt(Str(u'ab')))");
    }

    #[test]
    fn recording_mode_keeps_the_valid_neighbors() {
        let (arena, root, diagnostics) =
            parse("x = 1\n= 2\ny = 3\n", ErrorPolicy::Record);
        let children = arena.children(root);
        assert_eq!(children.len(), 3, "tree: {}", arena.dump(root));
        assert!(matches!(arena.kind(children[0]), NodeKind::Assign));
        assert!(matches!(arena.kind(children[1]), NodeKind::ErrorStmt));
        assert!(matches!(arena.kind(children[2]), NodeKind::Assign));
        assert_eq!(diagnostics.len(), 1, "diagnostics: {diagnostics:?}");
    }

    #[test]
    fn fail_fast_raises_on_the_same_input() {
        let (raw, _) = lex("x = 1\n= 2\ny = 3\n");
        let tokens = filter_tokens(raw, "test.py").expect("indentation");
        let mut parser = Parser::new("test.py", tokens, ErrorPolicy::FailFast, SourceEncoding::Utf8);
        assert!(matches!(
            parser.parse_module(),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn unexpected_indent_is_reported_and_skipped() {
        let (arena, root, diagnostics) =
            parse("x = 1\n    y = 2\nz = 3\n", ErrorPolicy::Record);
        let children = arena.children(root);
        assert_eq!(children.len(), 3);
        assert!(matches!(arena.kind(children[1]), NodeKind::ErrorStmt));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E1505");
    }

    #[test]
    fn missing_block_reports_and_continues() {
        let (arena, root, diagnostics) = parse("if x:\npass\n", ErrorPolicy::Record);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E1504");
        assert_eq!(arena.dump(root), "Module(If(Name(x), Suite), Pass)");
    }

    #[test]
    fn illegal_assignment_reports_through_the_policy() {
        let (_, _, diagnostics) = parse("1 = x\n", ErrorPolicy::Record);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E1600");
        assert!(diagnostics[0].message.contains("literal"));
    }

    #[test]
    fn statement_boundaries_cover_their_tokens() {
        let (raw, _) = lex("x = 10\n");
        let tokens = filter_tokens(raw, "test.py").expect("indentation");
        let mut parser =
            Parser::new("test.py", tokens, ErrorPolicy::FailFast, SourceEncoding::Utf8);
        let root = parser.parse_module().expect("parse");
        let (arena, stream, _) = parser.into_parts();
        let assign = arena.children(root)[0];
        let node = arena.node(assign);
        assert_eq!(node.token_start, 0);
        // One past the number token, newline excluded.
        assert_eq!(node.token_stop, 3);
        assert_eq!(node.char_start, 0);
        assert_eq!(node.char_stop, 6);
        assert_eq!((node.line, node.column), (1, 0));
        assert_eq!(stream[node.token_stop - 1].text, "10");
    }

    #[test]
    fn inline_suites_hang_off_the_header_line() {
        assert_eq!(
            tree("if x: pass\n"),
            "Module(If(Name(x), Suite(Pass)))"
        );
        assert_eq!(
            tree("while x: a = 1; b = 2\n"),
            "Module(While(Name(x), Suite(Assign(Name(a), Num(1)), Assign(Name(b), Num(2)))))"
        );
    }

    #[test]
    fn nested_blocks_parse_to_nested_suites() {
        let source = "def f(x):\n    if x:\n        return 1\n    return 0\n";
        assert_eq!(
            tree(source),
            "Module(FunctionDef[f](Params(Param[x]), Suite(If(Name(x), Suite(Return(Num(1)))), Return(Num(0)))))"
        );
    }

    #[test]
    fn parenthesized_yield_is_an_expression() {
        assert_eq!(
            tree("def f():\n    x = (yield)\n"),
            "Module(FunctionDef[f](Params, Suite(Assign(Name(x), YieldExpr))))"
        );
    }
}
