// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end scenarios: source text in, rendered value out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use copia_vm::Vm;

fn eval(source: &str) -> String {
    let mut vm = Vm::new();
    vm.eval_to_string(source)
}

#[test]
fn addition_of_several_integers() {
    assert_eq!(eval("(+ 1 2 3)"), "6");
}

#[test]
fn big_integer_multiplication_with_separators() {
    assert_eq!(
        eval("(* 1000000000000 1000000000000)"),
        "1,000,000,000,000,000,000,000,000"
    );
}

#[test]
fn integer_division_stays_exact() {
    assert_eq!(eval("(/ 1 3)"), "1/3");
}

#[test]
fn ratio_addition_simplifies() {
    assert_eq!(eval("(+ 1/2 1/3)"), "5/6");
}

#[test]
fn lambda_application() {
    assert_eq!(eval("((lambda (x) (* x x)) 7)"), "49");
}

#[test]
fn cdr_of_a_dotted_pair() {
    assert_eq!(eval("(cdr '(a . b))"), "b");
}

#[test]
fn try_recovers_the_exception_message() {
    assert_eq!(
        eval("(try ((car 1)) (:message *exception*))"),
        "\"Attempt to take CAR of non sequence\""
    );
}

#[test]
fn varargs_overflow_past_the_eight_registers() {
    assert_eq!(eval("((lambda args (length args)) 1 2 3 4 5 6 7 8 9)"), "9");
}

#[test]
fn dotted_pairs_round_trip_through_read_and_print() {
    assert_eq!(eval("(read-from-string \"(1 2 . 3)\")"), "(1 2 . 3)");
}

#[test]
fn a_small_program() {
    let mut vm = Vm::new();
    vm.eval_to_string("(set! fact (lambda (n) (cond ((equal n 0) 1) (t (* n (fact (- n 1)))))))");
    assert_eq!(vm.eval_to_string("(fact 10)"), "3,628,800");
    assert_eq!(
        vm.eval_to_string("(fact 25)"),
        "15,511,210,043,330,985,984,000,000"
    );
}

#[test]
fn mapcar_over_a_list() {
    assert_eq!(eval("(mapcar (lambda (n) (* n n)) '(1 2 3 4))"), "(1 4 9 16)");
}

#[test]
fn append_and_reverse() {
    assert_eq!(eval("(append '(1 2) '(3 4))"), "(1 2 3 4)");
    assert_eq!(eval("(reverse '(1 2 3))"), "(3 2 1)");
}
