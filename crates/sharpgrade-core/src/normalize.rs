//! Source normalizer.
//!
//! Rewrites a C# submission into canonical form: one public class with the
//! configured name, instance methods, the configured namespace, and the base
//! imports. The rewriting is pattern based and only ever touches the first
//! class and namespace header it finds, so helper classes survive untouched.

use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex};

use crate::model::TargetType;

/// Imports prepended when the submission brings none of its own.
pub const USING_STATEMENTS: &str = "
using System;
using System.Collections.Generic;
using System.Linq;
";

static CLASS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(public|private|protected|internal) (static )?class [^{]+\{")
        .expect("class header pattern is valid")
});

static STATIC_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(public|private|protected|internal) static ([^{]+)\{")
        .expect("static member pattern is valid")
});

static NAMESPACE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"namespace [^\n{ ]+[^{]*\{").expect("namespace header pattern is valid")
});

/// One step of the normalization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// Rename the first class header, or wrap everything in a class.
    ClassHeader,
    /// Drop `static` from every method declaration.
    InstanceMethods,
    /// Rename the first namespace header, or wrap everything in a namespace.
    Namespace,
    /// Prepend the base imports when none are present.
    Imports,
}

/// The rules in the order they must run: the namespace step wraps the
/// already-canonical class, and imports are checked last.
pub const PIPELINE: [RewriteRule; 4] = [
    RewriteRule::ClassHeader,
    RewriteRule::InstanceMethods,
    RewriteRule::Namespace,
    RewriteRule::Imports,
];

impl RewriteRule {
    pub fn name(&self) -> &'static str {
        match self {
            RewriteRule::ClassHeader => "class-header",
            RewriteRule::InstanceMethods => "instance-methods",
            RewriteRule::Namespace => "namespace",
            RewriteRule::Imports => "imports",
        }
    }

    /// Apply this rule to `source`.
    pub fn apply(&self, source: &str, target: &TargetType) -> String {
        match self {
            RewriteRule::ClassHeader => canonicalize_class(source, &target.class_name),
            RewriteRule::InstanceMethods => instance_methods(source),
            RewriteRule::Namespace => canonicalize_namespace(source, &target.namespace),
            RewriteRule::Imports => ensure_imports(source),
        }
    }
}

/// Rewrite `source` into canonical form for `target`.
///
/// Never fails: input that matches no pattern is wrapped wholesale, and
/// whether the result compiles is left to the compiler.
pub fn normalize(source: &str, target: &TargetType) -> String {
    PIPELINE.iter().fold(source.to_string(), |current, rule| {
        let next = rule.apply(&current, target);
        if next != current {
            tracing::debug!(rule = rule.name(), "normalization rule rewrote source");
        }
        next
    })
}

fn canonicalize_class(source: &str, class_name: &str) -> String {
    if CLASS_HEADER.is_match(source) {
        let header = format!("public class {class_name}\n{{");
        CLASS_HEADER
            .replacen(source, 1, NoExpand(&header))
            .into_owned()
    } else {
        format!("public class {class_name}\n{{\n{source}\n\n}}")
    }
}

fn instance_methods(source: &str) -> String {
    STATIC_MEMBER
        .replace_all(source, |caps: &Captures| {
            // Static class declarations keep their modifier.
            if caps[2].starts_with("class") {
                caps[0].to_string()
            } else {
                format!("{} {}\n{{", &caps[1], &caps[2])
            }
        })
        .into_owned()
}

fn canonicalize_namespace(source: &str, namespace: &str) -> String {
    if NAMESPACE_HEADER.is_match(source) {
        let header = format!("namespace {namespace}\n{{");
        NAMESPACE_HEADER
            .replacen(source, 1, NoExpand(&header))
            .into_owned()
    } else {
        format!("{USING_STATEMENTS}\n\nnamespace {namespace}\n{{\n{source}\n}}")
    }
}

fn ensure_imports(source: &str) -> String {
    if source.contains("using System") {
        source.to_string()
    } else {
        format!("{USING_STATEMENTS}\n{source}")
    }
}
