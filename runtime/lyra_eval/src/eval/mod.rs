//! The trampoline evaluator.
//!
//! Evaluation is a loop over two states (`Eval`, `Return`) and an explicit
//! stack of continuation frames, standing in for host call-stack frames.
//! Each frame is a tagged record of what to do with the value in the
//! `val` register; the collector traces every frame slot, so a collection
//! can run at any allocation point inside evaluation.
//!
//! `evaluate` captures a safety point (the stack depth at entry). Errors
//! truncate back to it, so a failed top-level evaluation leaves the
//! machine consistent and reusable.

use crate::env::Location;
use crate::errors::{self, EvalResult};
use crate::machine::Machine;
use lyra_heap::Trace;
use lyra_value::{Object, ProcBody, ProcData, ProcFlags, Value};
use smallvec::SmallVec;


/// A continuation frame: what to do with the next produced value.
#[derive(Clone, Debug)]
pub(crate) enum Frame {
    /// Evaluate the rest of a `do`/body sequence, discarding `val`.
    Sequence { rest: Value, env: Value },
    /// `val` is a test result; `clauses` starts with its consequent.
    IfBranch { clauses: Value, env: Value },
    /// Assign `val` to an existing binding of `name`.
    AssignTo { name: Value, env: Value },
    /// Write `val` through a location freshly created by `def`.
    DefineTo { location: Location },
    /// Write `val` through the current `let` binding, then continue with
    /// the remaining bindings or the body.
    LetBind {
        location: Location,
        pending: Value,
        body: Value,
        env: Value,
    },
    /// `val` is the evaluated operator; `args` are the unevaluated
    /// argument expressions.
    Operator { args: Value, env: Value },
    /// Argument accumulation: `pending` remain to evaluate, `done` holds
    /// evaluated arguments in reverse.
    Apply {
        fun: Value,
        pending: Value,
        done: Value,
        env: Value,
    },
    /// `val` is a macro expansion; evaluate it once more in the caller's
    /// environment.
    MacroExpand { caller_env: Value },
}

impl Trace for Frame {
    fn trace(&mut self, visit: &mut dyn FnMut(&mut Value)) {
        match self {
            Frame::Sequence { rest, env } => {
                visit(rest);
                visit(env);
            }
            Frame::IfBranch { clauses, env } => {
                visit(clauses);
                visit(env);
            }
            Frame::AssignTo { name, env } => {
                visit(name);
                visit(env);
            }
            Frame::DefineTo { location } => location.trace(visit),
            Frame::LetBind {
                location,
                pending,
                body,
                env,
            } => {
                location.trace(visit);
                visit(pending);
                visit(body);
                visit(env);
            }
            Frame::Operator { args, env } => {
                visit(args);
                visit(env);
            }
            Frame::Apply {
                fun,
                pending,
                done,
                env,
            } => {
                visit(fun);
                visit(pending);
                visit(done);
                visit(env);
            }
            Frame::MacroExpand { caller_env } => visit(caller_env),
        }
    }
}

/// Trampoline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Dispatch on the `expr` register.
    Eval,
    /// Deliver the `val` register to the top continuation frame.
    Return,
}

impl Machine {
    /// Evaluate one expression in `env` (`Nil` for the global
    /// environment), propagating every error to the caller.
    pub fn evaluate(&mut self, expr: Value, env: Value) -> EvalResult {
        let base = self.stack.len();
        let scratch_base = self.scratch.len();
        self.regs.expr = expr;
        self.regs.env = env;
        self.run(base, scratch_base, Step::Eval)
    }

    /// Apply a procedure to a proper list of arguments.
    ///
    /// A macro applied here binds `args` as literal (unevaluated) forms
    /// and evaluates its expansion in the machine's current environment
    /// register.
    pub fn apply(&mut self, fun: Value, args: Value) -> EvalResult {
        let base = self.stack.len();
        let scratch_base = self.scratch.len();
        let caller_env = self.regs.env;
        match self.apply_dispatch(fun, args, caller_env) {
            Ok(step) => self.run(base, scratch_base, step),
            Err(e) => {
                self.stack.truncate(base);
                self.scratch.truncate(scratch_base);
                Err(e)
            }
        }
    }

    /// The top-level boundary: recoverable errors become a diagnostic and
    /// the `error` sentinel; fatal errors propagate.
    pub fn eval_top(&mut self, expr: Value) -> EvalResult {
        match self.evaluate(expr, Value::Nil) {
            Ok(v) => {
                self.last_diagnostic = None;
                Ok(v)
            }
            Err(e) if e.code.is_fatal() => Err(e),
            Err(e) => {
                tracing::error!(code = %e.code, "top-level evaluation failed: {e}");
                self.last_diagnostic = Some(e.diagnostic());
                Ok(self.consts.error)
            }
        }
    }

    fn run(&mut self, base: usize, scratch_base: usize, mut step: Step) -> EvalResult {
        loop {
            let next = match step {
                Step::Eval => self.step_eval(),
                Step::Return => {
                    if self.stack.len() == base {
                        return Ok(self.regs.val);
                    }
                    self.step_return()
                }
            };
            match next {
                Ok(s) => step = s,
                Err(e) => {
                    // Unwind to the safety point; the heap stays intact.
                    self.stack.truncate(base);
                    self.scratch.truncate(scratch_base);
                    return Err(e);
                }
            }
        }
    }

    fn push_frame(&mut self, frame: Frame) -> EvalResult<()> {
        if self.stack.len() >= self.max_stack_depth {
            return Err(errors::stack_exhausted(self.stack.len()));
        }
        self.stack.push(frame);
        Ok(())
    }

    // === Eval dispatch ===

    fn step_eval(&mut self) -> EvalResult<Step> {
        let expr = self.regs.expr;
        if let Value::Obj(_) = expr {
            if self.is_symbol(expr) {
                self.regs.val = self.lookup_value(expr, self.regs.env)?;
                return Ok(Step::Return);
            }
            // Other heap objects are self-evaluating.
            self.regs.val = expr;
            return Ok(Step::Return);
        }
        if !expr.is_pair() {
            // Immediates and strings are literals.
            self.regs.val = expr;
            return Ok(Step::Return);
        }

        let (head, _) = self.expr_parts()?;
        if head == self.special.quote {
            return self.eval_quote();
        }
        if head == self.special.setv {
            return self.eval_setv();
        }
        if head == self.special.def {
            return self.eval_def();
        }
        if head == self.special.do_ {
            return self.eval_do();
        }
        if head == self.special.let_ {
            return self.eval_let();
        }
        if head == self.special.if_ {
            return self.eval_if();
        }
        if head == self.special.fn_ {
            return self.eval_procedure_form(false);
        }
        if head == self.special.macro_ {
            return self.eval_procedure_form(true);
        }

        // Application: evaluate the operator first.
        let (head, args) = self.expr_parts()?;
        self.push_frame(Frame::Operator {
            args,
            env: self.regs.env,
        })?;
        self.regs.expr = head;
        Ok(Step::Eval)
    }

    /// Head and tail of the form in the `expr` register.
    fn expr_parts(&self) -> EvalResult<(Value, Value)> {
        self.heap
            .as_cons(self.regs.expr)
            .ok_or_else(|| errors::internal("form dispatch on a non-pair"))
    }

    fn eval_quote(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let Some((datum, tail)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("quote", "expects exactly one form"));
        };
        if !tail.is_nil() {
            return Err(errors::malformed_form("quote", "expects exactly one form"));
        }
        self.regs.val = datum;
        Ok(Step::Return)
    }

    fn eval_setv(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let Some((mut name, after)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("setv", "expects a name and a value"));
        };
        // Accept a quoted name: (setv 'x 5).
        if name.is_pair() {
            if let Some((h, t)) = self.heap.as_cons(name) {
                if h == self.special.quote {
                    let Some((inner, tt)) = self.heap.as_cons(t) else {
                        return Err(errors::malformed_form("setv", "malformed quoted name"));
                    };
                    if !tt.is_nil() {
                        return Err(errors::malformed_form("setv", "malformed quoted name"));
                    }
                    name = inner;
                }
            }
        }
        if !self.is_symbol(name) {
            return Err(errors::malformed_form("setv", "name must be a symbol"));
        }
        let Some((value_expr, tail)) = self.heap.as_cons(after) else {
            return Err(errors::malformed_form("setv", "expects a value expression"));
        };
        if !tail.is_nil() {
            return Err(errors::malformed_form("setv", "takes exactly two forms"));
        }
        self.push_frame(Frame::AssignTo {
            name,
            env: self.regs.env,
        })?;
        self.regs.expr = value_expr;
        Ok(Step::Eval)
    }

    fn eval_def(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let Some((name, after)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("def", "expects a name and a value"));
        };
        if !self.is_symbol(name) {
            return Err(errors::malformed_form("def", "name must be a symbol"));
        }
        let Some((_, tail)) = self.heap.as_cons(after) else {
            return Err(errors::malformed_form("def", "expects a value expression"));
        };
        if !tail.is_nil() {
            return Err(errors::malformed_form("def", "takes exactly two forms"));
        }
        // Extend before evaluating so the value expression can refer to
        // the name (recursive definitions).
        let location = self.extend(name, self.regs.env)?;
        // The extension may have collected; re-derive the value form.
        let (_, rest) = self.expr_parts()?;
        let after = self
            .heap
            .cdr(rest)
            .ok_or_else(|| errors::internal("def form changed shape"))?;
        let value_expr = self
            .heap
            .car(after)
            .ok_or_else(|| errors::internal("def form changed shape"))?;
        self.push_frame(Frame::DefineTo { location })?;
        self.regs.expr = value_expr;
        Ok(Step::Eval)
    }

    fn eval_do(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let env = self.regs.env;
        self.begin_sequence(rest, env, "do")
    }

    fn eval_let(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let Some((bindings, _)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("let", "expects a binding list"));
        };
        if !bindings.is_nil() && !bindings.is_pair() {
            return Err(errors::malformed_form("let", "binding list must be a list"));
        }
        let env = self.regs.env;
        let frame_env = self.new_frame(env)?;
        // The frame allocation may have collected; re-derive the form.
        let (_, rest) = self.expr_parts()?;
        let Some((bindings, body)) = self.heap.as_cons(rest) else {
            return Err(errors::internal("let form changed shape"));
        };
        self.step_let(bindings, body, frame_env)
    }

    fn step_let(&mut self, pending: Value, body: Value, frame_env: Value) -> EvalResult<Step> {
        if pending.is_nil() {
            return self.begin_sequence(body, frame_env, "let");
        }
        let Some((name, after_name)) = self.heap.as_cons(pending) else {
            return Err(errors::malformed_form("let", "bindings must form a proper list"));
        };
        if !self.is_symbol(name) {
            return Err(errors::malformed_form("let", "binding names must be symbols"));
        }
        let Some((value_expr, rest_pending)) = self.heap.as_cons(after_name) else {
            return Err(errors::malformed_form(
                "let",
                "bindings require name/value pairs",
            ));
        };
        let location = self.extend(name, frame_env)?;
        self.push_frame(Frame::LetBind {
            location,
            pending: rest_pending,
            body,
            env: frame_env,
        })?;
        self.regs.expr = value_expr;
        self.regs.env = frame_env;
        Ok(Step::Eval)
    }

    fn eval_if(&mut self) -> EvalResult<Step> {
        let (_, rest) = self.expr_parts()?;
        let Some((test, clauses)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("if", "expects a test"));
        };
        self.push_frame(Frame::IfBranch {
            clauses,
            env: self.regs.env,
        })?;
        self.regs.expr = test;
        Ok(Step::Eval)
    }

    fn eval_procedure_form(&mut self, is_macro: bool) -> EvalResult<Step> {
        let form = if is_macro { "macro" } else { "fn" };
        let (_, rest) = self.expr_parts()?;
        let Some((params, _)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form(form, "expects a parameter spec"));
        };
        let (min_arity, variadic) = self.check_params(params, form)?;
        self.reserve(1)?;
        // Re-derive after the reservation.
        let (_, rest) = self.expr_parts()?;
        let Some((params, body)) = self.heap.as_cons(rest) else {
            return Err(errors::internal("procedure form changed shape"));
        };
        let mut flags = ProcFlags::empty();
        if is_macro {
            flags |= ProcFlags::MACRO;
        }
        if variadic {
            flags |= ProcFlags::VARIADIC;
        }
        let r = self.alloc_raw(Object::procedure(ProcData {
            flags,
            min_arity,
            params,
            env: self.regs.env,
            body: ProcBody::Exprs(body),
        }))?;
        self.regs.val = Value::Obj(r);
        Ok(Step::Return)
    }

    /// Validate a formal-parameter spec and compute (min arity, variadic).
    fn check_params(&self, params: Value, form: &str) -> EvalResult<(u8, bool)> {
        if params.is_nil() {
            return Ok((0, false));
        }
        if self.is_symbol(params) {
            // Bare symbol: binds the whole argument list.
            return Ok((0, true));
        }
        if !params.is_pair() {
            return Err(errors::malformed_form(
                form,
                "parameter spec must be a list or a symbol",
            ));
        }
        let mut count: usize = 0;
        let mut cursor = params;
        while cursor.is_pair() {
            let Some((name, rest)) = self.heap.as_cons(cursor) else {
                return Err(errors::internal("parameter spine changed shape"));
            };
            if !self.is_symbol(name) {
                return Err(errors::malformed_form(form, "parameter names must be symbols"));
            }
            count += 1;
            cursor = rest;
        }
        let min = u8::try_from(count).map_err(|_| errors::too_many_params())?;
        if cursor.is_nil() {
            return Ok((min, false));
        }
        if self.is_symbol(cursor) {
            // Dotted tail: variadic rest parameter.
            return Ok((min, true));
        }
        Err(errors::malformed_form(
            form,
            "parameter list must end in a symbol or nil",
        ))
    }

    /// Start a `do`-style sequence: empty yields `Nil`, otherwise evaluate
    /// the first form with a `Sequence` continuation for the rest.
    fn begin_sequence(&mut self, body: Value, env: Value, form: &str) -> EvalResult<Step> {
        if body.is_nil() {
            self.regs.val = Value::Nil;
            return Ok(Step::Return);
        }
        let Some((first, rest)) = self.heap.as_cons(body) else {
            return Err(errors::malformed_form(form, "body must be a proper list"));
        };
        if !rest.is_nil() {
            self.push_frame(Frame::Sequence { rest, env })?;
        }
        self.regs.expr = first;
        self.regs.env = env;
        Ok(Step::Eval)
    }

    // === Return dispatch ===

    fn step_return(&mut self) -> EvalResult<Step> {
        // The Apply frame must stay on the stack (rooted) while the
        // evaluated argument is consed on, so it is handled by peeking.
        if matches!(self.stack.last(), Some(Frame::Apply { .. })) {
            return self.continue_apply();
        }
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| errors::internal("continuation stack underflow"))?;
        match frame {
            Frame::Sequence { rest, env } => {
                let Some((next, tail)) = self.heap.as_cons(rest) else {
                    return Err(errors::improper_list("expression sequence"));
                };
                if !tail.is_nil() {
                    self.push_frame(Frame::Sequence { rest: tail, env })?;
                }
                self.regs.expr = next;
                self.regs.env = env;
                Ok(Step::Eval)
            }
            Frame::IfBranch { clauses, env } => self.continue_if(clauses, env),
            Frame::AssignTo { name, env } => {
                let value = self.regs.val;
                self.assign(name, value, env)?;
                Ok(Step::Return)
            }
            Frame::DefineTo { location } => {
                let value = self.regs.val;
                self.location_write(&location, value)?;
                Ok(Step::Return)
            }
            Frame::LetBind {
                location,
                pending,
                body,
                env,
            } => {
                let value = self.regs.val;
                self.location_write(&location, value)?;
                self.step_let(pending, body, env)
            }
            Frame::Operator { args, env } => self.continue_operator(args, env),
            Frame::Apply { .. } => Err(errors::internal("apply frame escaped the peek path")),
            Frame::MacroExpand { caller_env } => {
                // The expansion is evaluated exactly once more, in the
                // caller's environment.
                self.regs.expr = self.regs.val;
                self.regs.env = caller_env;
                Ok(Step::Eval)
            }
        }
    }

    fn continue_if(&mut self, clauses: Value, env: Value) -> EvalResult<Step> {
        let truthy = !self.regs.val.is_nil();
        if truthy {
            if clauses.is_nil() {
                // Test without a consequent.
                self.regs.val = Value::Nil;
                return Ok(Step::Return);
            }
            let consequent = self
                .heap
                .car(clauses)
                .ok_or_else(|| errors::malformed_form("if", "clauses must form a proper list"))?;
            self.regs.expr = consequent;
            self.regs.env = env;
            return Ok(Step::Eval);
        }
        // Skip the untaken consequent.
        let rest = if clauses.is_nil() {
            Value::Nil
        } else {
            self.heap
                .cdr(clauses)
                .ok_or_else(|| errors::malformed_form("if", "clauses must form a proper list"))?
        };
        if rest.is_nil() {
            // No alternative supplied.
            self.regs.val = Value::Nil;
            return Ok(Step::Return);
        }
        let Some((next, after)) = self.heap.as_cons(rest) else {
            return Err(errors::malformed_form("if", "clauses must form a proper list"));
        };
        if after.is_nil() {
            // Single trailing form: the alternative.
            self.regs.expr = next;
            self.regs.env = env;
            return Ok(Step::Eval);
        }
        // Another test/consequent pair.
        self.push_frame(Frame::IfBranch {
            clauses: after,
            env,
        })?;
        self.regs.expr = next;
        self.regs.env = env;
        Ok(Step::Eval)
    }

    fn continue_operator(&mut self, args: Value, env: Value) -> EvalResult<Step> {
        let fun = self.regs.val;
        if args.is_nil() {
            return self.apply_dispatch(fun, Value::Nil, env);
        }
        if !args.is_pair() {
            return Err(errors::improper_list("application form"));
        }
        // Macros receive their arguments unevaluated; check the operator
        // before evaluating anything.
        let resolved = self.resolve_operator(fun)?;
        if let Some(proc) = self.heap.procedure(resolved) {
            if proc.is_macro() && !proc.is_native() {
                return self.apply_dispatch(resolved, args, env);
            }
        }
        let Some((first, pending)) = self.heap.as_cons(args) else {
            return Err(errors::internal("argument spine changed shape"));
        };
        self.push_frame(Frame::Apply {
            fun: resolved,
            pending,
            done: Value::Nil,
            env,
        })?;
        self.regs.expr = first;
        self.regs.env = env;
        Ok(Step::Eval)
    }

    fn continue_apply(&mut self) -> EvalResult<Step> {
        // Attach the evaluated argument while the frame is still rooted.
        let done = match self.stack.last() {
            Some(Frame::Apply { done, .. }) => *done,
            _ => return Err(errors::internal("apply continuation missing")),
        };
        let value = self.regs.val;
        let cell = self.cons(value, done)?;
        let Some(Frame::Apply {
            fun,
            pending,
            done,
            env,
        }) = self.stack.last_mut()
        else {
            return Err(errors::internal("apply continuation missing"));
        };
        *done = cell;
        let (fun, pending, done, env) = (*fun, *pending, *done, *env);

        if pending.is_pair() {
            let Some((next, rest)) = self.heap.as_cons(pending) else {
                return Err(errors::internal("argument spine changed shape"));
            };
            let Some(Frame::Apply { pending, .. }) = self.stack.last_mut() else {
                return Err(errors::internal("apply continuation missing"));
            };
            *pending = rest;
            self.regs.expr = next;
            self.regs.env = env;
            return Ok(Step::Eval);
        }
        if !pending.is_nil() {
            return Err(errors::improper_list("application form"));
        }

        // All arguments evaluated; restore source order and dispatch.
        // `fun` and `env` must survive the reversal's allocations.
        self.stack.pop();
        self.push_root(fun);
        self.push_root(env);
        let args = self.list_reverse(done)?;
        let env = self.pop_root()?;
        let fun = self.pop_root()?;
        self.apply_dispatch(fun, args, env)
    }

    // === Application ===

    /// Substitute a type descriptor's registered constructor.
    fn resolve_operator(&self, fun: Value) -> EvalResult<Value> {
        if let Value::Type(idx) = fun {
            let ctor = self
                .ctors
                .get(idx.raw() as usize)
                .copied()
                .unwrap_or(Value::Nil);
            if ctor.is_nil() {
                return Err(errors::not_constructible(self.registry.type_name(idx)));
            }
            return Ok(ctor);
        }
        Ok(fun)
    }

    /// Apply `fun` to a proper list of arguments. For interpreted
    /// procedures `args` are evaluated values; for macros they are the
    /// literal argument forms and `caller_env` is where the expansion
    /// runs.
    pub(crate) fn apply_dispatch(
        &mut self,
        fun: Value,
        args: Value,
        caller_env: Value,
    ) -> EvalResult<Step> {
        let fun = self.resolve_operator(fun)?;
        let Some(proc) = self.heap.procedure(fun) else {
            return Err(errors::not_callable(self.type_name_of(fun)));
        };
        let (flags, min_arity, body) = (proc.flags, proc.min_arity, proc.body);
        let variadic = flags.contains(ProcFlags::VARIADIC);

        let argc = self
            .heap
            .list_length(args)
            .ok_or_else(|| errors::improper_list("argument list"))? as usize;
        let arity_ok = if variadic {
            argc >= usize::from(min_arity)
        } else {
            argc == usize::from(min_arity)
        };
        if !arity_ok {
            let name = self.procedure_label(body, flags);
            return Err(errors::wrong_arg_count(&name, min_arity, argc, variadic));
        }

        if flags.contains(ProcFlags::NATIVE) {
            let ProcBody::Native(id) = body else {
                return Err(errors::internal("native procedure without native body"));
            };
            let mut argv: SmallVec<[Value; 6]> = SmallVec::new();
            let mut cursor = args;
            while let Some((car, cdr)) = self.heap.as_cons(cursor) {
                argv.push(car);
                cursor = cdr;
            }
            let result = self.invoke_native(id, &argv)?;
            self.regs.val = result;
            return Ok(Step::Return);
        }

        if flags.contains(ProcFlags::MACRO) {
            // Root the caller environment in the expansion frame before
            // binding can collect.
            self.push_frame(Frame::MacroExpand { caller_env })?;
            let (frame_env, proc_body) = self.bind_params(fun, args)?;
            return self.begin_sequence(proc_body, frame_env, "macro");
        }

        let (frame_env, proc_body) = self.bind_params(fun, args)?;
        self.begin_sequence(proc_body, frame_env, "fn")
    }

    /// Display label for arity diagnostics.
    fn procedure_label(&self, body: ProcBody, flags: ProcFlags) -> String {
        match body {
            ProcBody::Native(id) => self
                .natives
                .get(id.raw() as usize)
                .map_or_else(|| "#<builtin>".to_string(), |def| def.name.to_string()),
            ProcBody::Exprs(_) if flags.contains(ProcFlags::MACRO) => "macro".to_string(),
            ProcBody::Exprs(_) => "fn".to_string(),
        }
    }

    /// Build the application frame: bind formals to `args` in a fresh
    /// frame chained onto the closure's captured environment. Returns the
    /// frame and the procedure body, both read after the last possible
    /// collection point.
    fn bind_params(&mut self, fun: Value, args: Value) -> EvalResult<(Value, Value)> {
        self.push_root(fun);
        self.push_root(args);
        let reserved = self.reserve(1);
        let args = self.pop_root()?;
        let fun = self.pop_root()?;
        reserved?;
        // No collection below this point; locals are stable.
        let proc = self
            .heap
            .procedure(fun)
            .ok_or_else(|| errors::internal("binding parameters of a non-procedure"))?;
        let (params, parent, body) = (proc.params, proc.env, proc.body);
        let frame_ref = self.alloc_raw(Object::frame(parent))?;
        let frame_env = Value::Obj(frame_ref);

        let mut pnames = params;
        let mut remaining = args;
        loop {
            if pnames.is_nil() {
                break;
            }
            if self.is_symbol(pnames) {
                // Variadic tail (or bare-symbol spec): binds the rest of
                // the argument list, sharing its spine.
                let frame = self.frame_data_mut(frame_env)?;
                frame.names.push(pnames);
                frame.values.push(remaining);
                break;
            }
            let Some((pname, prest)) = self.heap.as_cons(pnames) else {
                return Err(errors::internal("parameter spine changed shape"));
            };
            let Some((arg, arest)) = self.heap.as_cons(remaining) else {
                // Arity was validated; running out of arguments here is
                // an invariant violation.
                return Err(errors::internal("argument list shorter than arity"));
            };
            let frame = self.frame_data_mut(frame_env)?;
            frame.names.push(pname);
            frame.values.push(arg);
            pnames = prest;
            remaining = arest;
        }
        let body = match body {
            ProcBody::Exprs(b) => b,
            ProcBody::Native(_) => Value::Nil,
        };
        Ok((frame_env, body))
    }
}
