use pytoc::options::CompileOptions;

fn compile(source: &str) -> String {
    pytoc::compile_module(source, &CompileOptions::default()).unwrap_or_else(|err| panic!("compile failed: {err}"))
}

mod running_max {
    use super::*;

    // The scenario's literal signature is `def m(*nums) -> int`, but `*args` has no
    // fixed-arity C signature in this dialect (spec §4.1, "Supported parameter forms") and
    // is rejected at build time - see `variadic_parameters_are_rejected` below. `nums: list`
    // exercises the same subscript/rebinding/return behavior through a supported form.
    const SOURCE: &str = "\
def m(nums: list) -> int:
    r: int = nums[0]
    for n in nums:
        if n > r:
            r = n
    return r
";

    #[test]
    fn rebinding_unboxes_the_loop_variable() {
        let c = compile(SOURCE);
        assert!(c.contains("r = get_int(n)"), "rebinding assignment should unbox via get_int, got:\n{c}");
    }

    #[test]
    fn return_boxes_the_running_value() {
        let c = compile(SOURCE);
        assert!(c.contains("return new_int(r)"), "return should box via new_int, got:\n{c}");
    }

    #[test]
    fn variadic_parameters_are_rejected() {
        let err = pytoc::compile_module("def m(*nums) -> int:\n    return nums[0]\n", &CompileOptions::default())
            .expect_err("*args has no fixed-arity C signature");
        assert!(
            err.to_string().contains("fixed-arity"),
            "error should explain the fixed-arity calling convention, got: {err}"
        );
    }
}

mod record_distance {
    use super::*;

    const SOURCE: &str = "\
class Point:
    x: int
    y: int

def d2(p1: Point, p2: Point) -> int:
    return (p2.x - p1.x) ** 2 + (p2.y - p1.y) ** 2
";

    #[test]
    fn field_access_is_an_unboxed_struct_cast() {
        let c = compile(SOURCE);
        assert!(
            c.contains("((Point_obj_t*)to_ptr(p1))->x"),
            "field read should be a direct struct cast, got:\n{c}"
        );
        assert!(c.contains("((Point_obj_t*)to_ptr(p2))->x"), "got:\n{c}");
    }

    #[test]
    fn only_the_final_result_is_boxed() {
        let c = compile(SOURCE);
        // the subtractions and squaring stay on scalar ints; only the outermost `return`
        // boxes the sum.
        assert!(c.contains("return new_int("), "final return should box the sum, got:\n{c}");
    }
}

mod method_dispatch {
    use super::*;

    const SOURCE: &str = "\
def u(s: str) -> str:
    return s.upper()
";

    #[test]
    fn upper_call_lowers_to_load_attr_then_call_n_kw() {
        let c = compile(SOURCE);
        assert!(c.contains("load_attr(s, MP_QSTR_upper)"), "got:\n{c}");
        assert!(c.contains("call_n_kw("), "got:\n{c}");
    }
}

mod checked_floor_div {
    use super::*;

    const SOURCE: &str = "\
def safe(a: int, b: int) -> int:
    try:
        return a // b
    except ZeroDivisionError:
        return 0
";

    #[test]
    fn floor_div_inside_try_uses_the_checked_helper() {
        let c = compile(SOURCE);
        assert!(c.contains("pytoc_checked_floor_div(a, b)"), "got:\n{c}");
        assert!(c.contains("static mp_int_t pytoc_checked_floor_div"), "helper must be emitted, got:\n{c}");
    }

    #[test]
    fn handler_checks_the_exception_type_before_matching() {
        let c = compile(SOURCE);
        assert!(c.contains("is_subclass_fast(type_of("), "got:\n{c}");
        assert!(c.contains("&type_ZeroDivisionError"), "got:\n{c}");
    }

    #[test]
    fn a_return_inside_try_pops_its_checkpoint_before_returning() {
        let c = compile(SOURCE);
        assert!(c.contains("nlr_pop();"), "got:\n{c}");
    }
}

mod nested_try {
    use super::*;

    const SOURCE: &str = "\
def nested(a: int, b: int, c: int) -> int:
    try:
        try:
            return a // b
        except ZeroDivisionError:
            return b // c
    except ZeroDivisionError:
        return -1
";

    #[test]
    fn uses_two_distinct_checkpoints() {
        let c = compile(SOURCE);
        assert!(c.contains("nlr_buf_t nlr_0"), "got:\n{c}");
        assert!(c.contains("nlr_buf_t nlr_1"), "got:\n{c}");
    }

    #[test]
    fn inner_handler_still_sees_the_still_open_outer_checkpoint() {
        let c = compile(SOURCE);
        // the inner try deactivates its own checkpoint before its handler body is built, but
        // the outer checkpoint is still open, so the nested floor-div still goes through the
        // checked helper.
        assert!(c.contains("pytoc_checked_floor_div(b, c)"), "got:\n{c}");
    }
}

mod finally_cleanup {
    use super::*;

    const SOURCE: &str = "\
def cleanup(v: int) -> int:
    r: int = 0
    try:
        r = v * 2
    finally:
        r = r + 1
    return r
";

    #[test]
    fn finally_runs_and_tracks_whether_an_exception_occurred() {
        let c = compile(SOURCE);
        assert!(c.contains("_exc_occurred"), "got:\n{c}");
        assert!(c.contains("r = (r + 1)"), "finally body must still run, got:\n{c}");
    }

    #[test]
    fn re_raises_after_finally_only_if_the_flag_is_set() {
        let c = compile(SOURCE);
        assert!(c.contains("if (nlr_0_exc_occurred)"), "got:\n{c}");
    }
}

mod module_registration {
    use super::*;

    #[test]
    fn every_top_level_function_is_listed_in_the_globals_table() {
        let c = compile("def f(a: int) -> int:\n    return a\n");
        assert!(c.contains("MP_QSTR_f"), "got:\n{c}");
        assert!(c.contains("pytoc_f_obj"), "got:\n{c}");
        assert!(c.contains("MP_REGISTER_MODULE"), "got:\n{c}");
    }
}
