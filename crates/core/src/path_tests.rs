// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    dots_everywhere    = { "/a///b/.//./c/././d", "/a/b/c/d" },
    up_terms           = { "/a///../b//..////c/d/", "/c/d/" },
    dup_slashes        = { "///hell//world//////", "/hell/world/" },
    plain              = { "a/b/c", "a/b/c" },
    root_only          = { "///", "/" },
    up_to_root         = { "/a/..", "/" },
    relative_collapse  = { "a/../b", "b" },
    relative_to_empty  = { "a/..", "" },
    only_dot           = { ".", "" },
    leading_up_kept    = { "../../a", "../../a" },
    up_after_segment   = { "a/../../b", "../b" },
    pure_ups           = { "a/../..", "../" },
)]
fn normalize_cases(input: &str, expected: &str) {
    assert_eq!(normalize(input).as_deref(), Some(expected));
}

#[yare::parameterized(
    escape_direct   = { "/../x" },
    escape_nested   = { "/a/../../x" },
    escape_trailing = { "/.." },
)]
fn normalize_rejects_escaping_root(input: &str) {
    assert_eq!(normalize(input), None);
}

proptest! {
    #[test]
    fn normalize_is_idempotent(path in "[a-z./]{0,40}") {
        if let Some(once) = normalize(&path) {
            prop_assert_eq!(normalize(&once), Some(once.clone()));
        }
    }
}

#[yare::parameterized(
    simple      = { "foo", true },
    with_digits = { "v2.raw", true },
    dashed      = { "a-b_c", true },
    slash       = { "foo/baz", false },
    empty       = { "", false },
    dot         = { ".", false },
    dotdot      = { "..", false },
    space       = { "a b", false },
    unicode     = { "héllo", false },
)]
fn validate_name_cases(name: &str, ok: bool) {
    assert_eq!(validate_name(name), ok);
}

#[test]
fn drop_trailing_slash_strips_all() {
    assert_eq!(drop_trailing_slash("///hoge//piyo//////"), "///hoge//piyo");
    assert_eq!(drop_trailing_slash("abc"), "abc");
    assert_eq!(drop_trailing_slash("///"), "");
}

#[test]
fn dirname_keeps_separators() {
    assert_eq!(dirname("///hoge//piyo//////"), "///hoge//");
    assert_eq!(dirname("a/b"), "a/");
    assert_eq!(dirname("plain"), "");
}

#[test]
fn basename_keeps_input_tail() {
    assert_eq!(basename("///hoge//piyo//////"), "piyo//////");
    assert_eq!(basename("a/b"), "b");
    assert_eq!(basename("plain"), "plain");
}
