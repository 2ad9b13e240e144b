// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the evaluator and the special forms.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use crate::vm::Vm;

fn eval(source: &str) -> String {
    let mut vm = Vm::new();
    vm.eval_to_string(source)
}

#[test]
fn self_evaluating_values() {
    assert_eq!(eval("42"), "42");
    assert_eq!(eval("\"hello\""), "\"hello\"");
    assert_eq!(eval(":key"), ":key");
    assert_eq!(eval("t"), "t");
    assert_eq!(eval("nil"), "nil");
    assert_eq!(eval("2.5"), "2.5");
}

#[test]
fn quote_returns_its_argument_unevaluated() {
    assert_eq!(eval("'foo"), "foo");
    assert_eq!(eval("'(1 2 3)"), "(1 2 3)");
    assert_eq!(eval("(quote (a . b))"), "(a . b)");
}

#[test]
fn unbound_symbol_throws() {
    let result = eval("no-such-binding");
    assert!(result.contains("Exception"));
    assert!(result.contains("unbound symbol"));
}

#[test]
fn addition_folds_over_all_arguments() {
    assert_eq!(eval("(+ 1 2 3)"), "6");
    assert_eq!(eval("(+)"), "0");
    assert_eq!(eval("(+ 1 2 3 4 5 6 7 8 9 10)"), "55");
}

#[test]
fn lambda_application_binds_formals() {
    assert_eq!(eval("((lambda (x) (* x x)) 7)"), "49");
    assert_eq!(eval("((lambda (a b) (+ a b)) 3 4)"), "7");
}

#[test]
fn lambda_body_is_a_progn() {
    assert_eq!(eval("((lambda (x) (+ x 1) (+ x 2)) 10)"), "12");
}

#[test]
fn varargs_lambda_binds_the_whole_list() {
    assert_eq!(eval("((lambda args (length args)) 1 2 3)"), "3");
    assert_eq!(eval("((lambda args args) 1 2 3)"), "(1 2 3)");
}

#[test]
fn arguments_evaluate_left_to_right_into_registers() {
    assert_eq!(eval("((lambda (a b c) c) (+ 1 1) (+ 2 2) (+ 3 3))"), "6");
}

#[test]
fn nested_application() {
    assert_eq!(eval("(+ (* 2 3) (* 4 5))"), "26");
}

#[test]
fn cond_takes_the_first_truthy_clause() {
    assert_eq!(eval("(cond (nil 1) (t 2))"), "2");
    assert_eq!(eval("(cond ((equal 1 2) 1) ((equal 2 2) 4))"), "4");
    assert_eq!(eval("(cond (nil 1))"), "nil");
}

#[test]
fn set_shriek_binds_in_the_oblist() {
    let mut vm = Vm::new();
    assert_eq!(vm.eval_to_string("(set! x 17)"), "17");
    assert_eq!(vm.eval_to_string("x"), "17");
    assert_eq!(vm.eval_to_string("(+ x x)"), "34");
}

#[test]
fn set_shriek_evaluates_its_value_form() {
    let mut vm = Vm::new();
    assert_eq!(vm.eval_to_string("(set! x (+ 1 2))"), "3");
    assert_eq!(vm.eval_to_string("x"), "3");
}

#[test]
fn earlier_environments_survive_rebinding() {
    let mut vm = Vm::new();
    vm.eval_to_string("(set! x 1)");
    vm.eval_to_string("(set! f (lambda () x))");
    vm.eval_to_string("(set! x 2)");
    // The lambda still sees the current oblist at call time; the old
    // chain is untouched but shadowed.
    assert_eq!(vm.eval_to_string("(f)"), "2");
}

#[test]
fn let_binds_sequentially() {
    assert_eq!(eval("(let ((x . 3)) (+ x 1))"), "4");
    assert_eq!(eval("(let ((x 3) (y (+ x 1))) (* x y))"), "12");
}

#[test]
fn progn_returns_the_last_value() {
    assert_eq!(eval("(progn 1 2 3)"), "3");
    assert_eq!(eval("(progn)"), "nil");
}

#[test]
fn try_returns_the_body_value_without_exception() {
    assert_eq!(eval("(try ((+ 1 2)) (99))"), "3");
}

#[test]
fn try_recovers_with_the_exception_bound() {
    assert_eq!(
        eval("(try ((car 1)) ((:message *exception*)))"),
        "\"Attempt to take CAR of non sequence\""
    );
    assert_eq!(eval("(try ((car 1)) (42))"), "42");
}

#[test]
fn exceptions_short_circuit_argument_evaluation() {
    let result = eval("(+ 1 (car 2) 3)");
    assert!(result.contains("Exception"));
    assert!(result.contains("CAR of non sequence"));
}

#[test]
fn exceptions_short_circuit_progn() {
    let result = eval("(progn (car 1) 99)");
    assert!(result.contains("Exception"));
}

#[test]
fn not_callable_throws() {
    let result = eval("(1 2 3)");
    assert!(result.contains("Exception"));
    assert!(result.contains("function position"));
}

#[test]
fn keywords_are_accessors() {
    assert_eq!(eval("(:b {:a 1, :b 2})"), "2");
    assert_eq!(eval("(:missing {:a 1})"), "nil");
}

#[test]
fn hashmaps_are_functions_of_their_keys() {
    assert_eq!(eval("({:a 1, :b 2} :a)"), "1");
}

#[test]
fn user_thrown_exceptions_carry_their_message() {
    assert_eq!(
        eval("(try ((exception \"deliberate\")) ((:message *exception*)))"),
        "\"deliberate\""
    );
}

#[test]
fn eval_evaluates_once_more() {
    assert_eq!(eval("(eval '(+ 1 2))"), "3");
}

#[test]
fn apply_builds_the_combination() {
    assert_eq!(eval("(apply + '(1 2 3))"), "6");
}

#[test]
fn nlambda_receives_raw_forms() {
    // The argument is not evaluated, so an unbound symbol is fine.
    assert_eq!(eval("((nlambda (x) x) some-unbound-symbol)"), "some-unbound-symbol");
}
