use smallisp::{Config, Environment, ErrorKind, Value, eval, eval_str, parse, register_stdlib};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

fn setup() -> Environment {
    let mut env = Environment::new();
    register_stdlib(&mut env);
    env
}

fn eval_expr(expr: &str) -> String {
    let mut env = setup();
    match eval_str(expr, &mut env) {
        Ok(result) => result.to_string(),
        Err(e) => format!("Error: {e}"),
    }
}

/// Output sink the test keeps a handle to after giving it to the environment.
#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capturing_env() -> (Environment, Captured) {
    let mut env = setup();
    let captured = Captured::default();
    env.set_output(Box::new(captured.clone()));
    (env, captured)
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval_expr("(+ 1 2 3)"), "6");
    assert_eq!(eval_expr("(- 5)"), "-5");
    assert_eq!(eval_expr("(- 10 1 2)"), "7");
    assert_eq!(eval_expr("(+ (- 10 4) (mul 2 3))"), "12");
    assert_eq!(eval_expr("(mod 17 5)"), "2");
}

#[test]
fn test_singletons() {
    assert_eq!(eval_expr("nil"), "nil");
    assert_eq!(eval_expr("T"), "T");
    assert_eq!(eval_expr("42"), "42");
}

#[test]
fn test_if_selects_branch() {
    assert_eq!(eval_expr("(if nil 1 2)"), "2");
    assert_eq!(eval_expr("(if T 1 2)"), "1");
    assert_eq!(eval_expr("(if (eq 1 1) 10 20)"), "10");
}

#[test]
fn test_if_evaluates_one_branch_only() {
    let (mut env, out) = capturing_env();
    eval_str("(if T (println 1) (println 2))", &mut env).unwrap();
    eval_str("(if nil (println 3) (println 4))", &mut env).unwrap();
    assert_eq!(out.text(), "1\n4\n");
}

#[test]
fn test_comparisons_answer_t_or_nil() {
    assert_eq!(eval_expr("(eq 1 1)"), "T");
    assert_eq!(eval_expr("(eq 1 2)"), "nil");
    assert_eq!(eval_expr("(lt 1 2)"), "T");
    assert_eq!(eval_expr("(lt 2 1)"), "nil");
    assert_eq!(eval_expr("(eq (list 1 2) (list 1 2))"), "T");
    assert_eq!(eval_expr("(lt (list 1 2) (list 1 3))"), "T");
    assert_eq!(eval_expr("(eq nil T)"), "nil");
}

#[test]
fn test_let_overwrites() {
    let mut env = setup();
    assert_eq!(eval_str("(let x 5)", &mut env).unwrap(), Value::Integer(5));
    assert_eq!(eval_str("x", &mut env).unwrap(), Value::Integer(5));
    eval_str("(let x 6)", &mut env).unwrap();
    assert_eq!(eval_str("x", &mut env).unwrap(), Value::Integer(6));
}

#[test]
fn test_unbound_symbol_is_nil() {
    assert_eq!(eval_expr("never-bound"), "nil");
    assert_eq!(eval_expr("(if undefined 1 2)"), "2");
}

#[test]
fn test_define_and_call() {
    let mut env = setup();
    assert_eq!(
        eval_str("(define (square x) (mul x x))", &mut env)
            .unwrap()
            .to_string(),
        "(square x)"
    );
    assert_eq!(eval_str("(square 4)", &mut env).unwrap(), Value::Integer(16));
    assert_eq!(
        eval_str("(square)", &mut env).unwrap_err().kind(),
        ErrorKind::Arity
    );
    assert_eq!(
        eval_str("(square 1 2)", &mut env).unwrap_err().kind(),
        ErrorKind::Arity
    );
    // Functions are first-class values.
    assert_eq!(eval_str("square", &mut env).unwrap().to_string(), "(square x)");
    eval_str("(let sq square)", &mut env).unwrap();
    assert_eq!(eval_str("(sq 5)", &mut env).unwrap(), Value::Integer(25));
}

#[test]
fn test_recursion_through_global_frame() {
    // Works because `n` is read before the recursive call rebinds it.
    let mut env = setup();
    eval_str(
        "(define (fact n) (if (lt n 1) 1 (mul n (fact (- n 1)))))",
        &mut env,
    )
    .unwrap();
    assert_eq!(eval_str("(fact 5)", &mut env).unwrap(), Value::Integer(120));
    assert_eq!(eval_str("(fact 0)", &mut env).unwrap(), Value::Integer(1));
}

#[test]
fn test_recursive_calls_clobber_parameters() {
    // Parameters share the single global frame: (fib 1) leaves n = 1 behind,
    // so the second call is (fib -1) and (fib 2) computes 1 + -1 = 0.
    let mut env = setup();
    eval_str(
        "(define (fib n) (if (lt n 2) n (+ (fib (- n 1)) (fib (- n 2)))))",
        &mut env,
    )
    .unwrap();
    assert_eq!(eval_str("(fib 1)", &mut env).unwrap(), Value::Integer(1));
    assert_eq!(eval_str("(fib 2)", &mut env).unwrap(), Value::Integer(0));
}

#[test]
fn test_while_loop() {
    let (mut env, out) = capturing_env();
    let result = eval_str(
        "(let i 3)
         (while (lt 0 i)
           (progn (println i) (let i (- i 1))))",
        &mut env,
    )
    .unwrap();
    assert_eq!(out.text(), "3\n2\n1\n");
    assert_eq!(result, Value::Integer(0));
}

#[test]
fn test_while_false_initially() {
    let (mut env, out) = capturing_env();
    let result = eval_str("(while nil (println 1))", &mut env).unwrap();
    assert_eq!(result, Value::Nil);
    assert_eq!(out.text(), "");
}

#[test]
fn test_println_prints_each_argument() {
    let (mut env, out) = capturing_env();
    let result = eval_str("(println 1 (+ 1 1) T nil println)", &mut env).unwrap();
    assert_eq!(result, Value::Nil);
    assert_eq!(out.text(), "1\n2\nT\nnil\nbuiltin_println\n");
}

#[test]
fn test_print_stays_on_line() {
    let (mut env, out) = capturing_env();
    eval_str("(print 1 2) (print 3)", &mut env).unwrap();
    assert_eq!(out.text(), "1 23");
}

#[test]
fn test_car_cdr_double_evaluation() {
    // car/cdr evaluate what they extract; kept for compatibility.
    let mut env = setup();
    eval_str("(let a 11)", &mut env).unwrap();
    assert_eq!(
        eval_str("(car (quote (a b)))", &mut env).unwrap(),
        Value::Integer(11)
    );
    assert_eq!(
        eval_str("(cdr (cons 1 (quote (+ 2 3))))", &mut env).unwrap(),
        Value::Integer(5)
    );
    assert_eq!(eval_str("(car 1)", &mut env).unwrap(), Value::Nil);
}

#[test]
fn test_string_concatenation_via_api() {
    let mut env = setup();
    let form = Value::list([Value::symbol("+"), Value::string("a"), Value::Integer(1)]);
    assert_eq!(eval(&form, &mut env).unwrap().to_string(), "a1");
}

#[test]
fn test_errors_are_classified() {
    let mut env = setup();
    assert_eq!(eval_str("(1 2)", &mut env).unwrap_err().kind(), ErrorKind::Dispatch);
    assert_eq!(eval_str("(+ 1 T)", &mut env).unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval_str("(mod 1 T)", &mut env).unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval_str("(define (f) 1 2)", &mut env).unwrap_err().kind(), ErrorKind::Arity);
    assert_eq!(eval_str("(1 2", &mut env).unwrap_err().kind(), ErrorKind::Read);
    assert_eq!(eval_str("[1]", &mut env).unwrap_err().kind(), ErrorKind::Read);
}

#[test]
fn test_runaway_recursion_is_reported() {
    let mut env = Environment::with_config(Config::default().with_max_depth(200));
    register_stdlib(&mut env);
    eval_str("(define (forever n) (forever n))", &mut env).unwrap();
    let err = eval_str("(forever 1)", &mut env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(env.depth(), 0);
    // The environment is still usable afterwards.
    assert_eq!(eval_str("(+ 1 1)", &mut env).unwrap(), Value::Integer(2));
}

#[test]
fn test_default_limit_holds_on_spawned_thread() {
    let handle = std::thread::spawn(|| {
        let mut env = Environment::with_config(Config::default());
        register_stdlib(&mut env);
        eval_str("(define (climb n) (if (lt n 0) 0 (climb (+ n 1))))", &mut env).unwrap();
        let kind = eval_str("(climb 0)", &mut env).unwrap_err().kind();
        (kind, env.depth())
    });
    let (kind, depth) = handle.join().unwrap();
    assert_eq!(kind, ErrorKind::Resource);
    assert_eq!(depth, 0);
}

#[test]
fn test_raised_limit_on_spawned_thread() {
    let handle = std::thread::spawn(|| {
        let mut env = Environment::with_config(Config::default().with_max_depth(50_000));
        register_stdlib(&mut env);
        eval_str("(define (down n) (if (eq n 0) 0 (+ 1 (down (- n 1)))))", &mut env).unwrap();
        eval_str("(down 5000)", &mut env).unwrap()
    });
    assert_eq!(handle.join().unwrap(), Value::Integer(5000));
}

#[test]
fn test_million_element_list() {
    let source = format!("(quote ({}))", "1 ".repeat(1_000_000));
    let form = parse(&source).unwrap();
    let mut env = setup();
    let list = eval(&form, &mut env).unwrap();
    assert_eq!(list.iter().count(), 1_000_000);
    drop(form);
    assert_eq!(list.first(), Some(&Value::Integer(1)));
    drop(list);
}

#[test]
fn test_print_read_round_trip() {
    for source in ["(a (b c) d)", "(1 -2 3)", "((x))", "(+ - foo-bar)"] {
        let value = parse(source).unwrap();
        assert_eq!(value.to_string(), source);
        assert_eq!(parse(&value.to_string()).unwrap(), value);
    }
}
