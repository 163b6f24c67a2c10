//! Generated C# harness.
//!
//! The harness is compiled into the same assembly as the submission and is
//! its entry point. It has two modes:
//!
//! - `describe <result>` resolves the target type and writes the signature
//!   of its first declared public method.
//! - `run <inputs> <result>` reads encoded arguments, creates a fresh
//!   instance, invokes the method, and writes the outcome.
//!
//! Outcomes go to the result file, never stdout, so whatever the candidate
//! prints cannot be mistaken for a reply. The first line of the file is the
//! outcome kind and the rest is its payload.

use sharpgrade_core::model::TargetType;

/// Fully qualified name of the harness class, used as the assembly entry point.
pub const DRIVER_TYPE: &str = "SharpGradeHarness.Driver";

const TARGET_PLACEHOLDER: &str = "@@TARGET_TYPE@@";

const TEMPLATE: &str = r#"using System;
using System.Collections;
using System.Collections.Generic;
using System.Globalization;
using System.IO;
using System.Reflection;
using System.Text;

namespace SharpGradeHarness
{
    public static class Driver
    {
        const string TargetTypeName = @@TARGET_TYPE@@;
        const int MaxDepth = 32;
        static readonly UTF8Encoding Utf8 = new UTF8Encoding(false);

        public static int Main(string[] args)
        {
            if (args.Length == 2 && args[0] == "describe")
            {
                return Describe(args[1]);
            }
            if (args.Length == 3 && args[0] == "run")
            {
                return Run(args[1], args[2]);
            }
            Console.Error.WriteLine("usage: describe <result> | run <inputs> <result>");
            return 2;
        }

        static Type ResolveType()
        {
            return typeof(Driver).Assembly.GetType(TargetTypeName);
        }

        static MethodInfo ResolveMethod(Type type)
        {
            MethodInfo[] methods = type.GetMethods(
                BindingFlags.Public | BindingFlags.Instance | BindingFlags.Static | BindingFlags.DeclaredOnly);
            foreach (MethodInfo method in methods)
            {
                if (!method.IsSpecialName)
                {
                    return method;
                }
            }
            return null;
        }

        static int Describe(string resultPath)
        {
            string kind;
            string payload;
            try
            {
                Type type = ResolveType();
                MethodInfo method = type == null ? null : ResolveMethod(type);
                if (type == null)
                {
                    kind = "MISSING";
                    payload = "type " + TargetTypeName + " was not found in the compiled assembly";
                }
                else if (method == null)
                {
                    kind = "MISSING";
                    payload = "type " + TargetTypeName + " declares no public methods";
                }
                else
                {
                    kind = "METHOD";
                    payload = method.ToString();
                }
            }
            catch (Exception e)
            {
                kind = "HARNESS";
                payload = e.ToString();
            }
            WriteResult(resultPath, kind, payload);
            return 0;
        }

        static int Run(string inputPath, string resultPath)
        {
            string kind;
            string payload;
            try
            {
                Type type = ResolveType();
                MethodInfo method = type == null ? null : ResolveMethod(type);
                if (method == null)
                {
                    throw new MissingMethodException("no method under test on " + TargetTypeName);
                }
                object[] raw = new InputReader(File.ReadAllText(inputPath, Utf8)).ReadArguments();
                object[] arguments = CoerceArguments(method, raw);
                object instance = method.IsStatic ? null : Activator.CreateInstance(type);
                object returned = method.Invoke(instance, arguments);

                StringBuilder json = new StringBuilder();
                WriteJson(json, method.ReturnType == typeof(void) ? null : returned, 0);
                kind = "RETURN";
                payload = json.ToString();
            }
            catch (TargetInvocationException e)
            {
                kind = "THROWN";
                payload = (e.InnerException ?? e).ToString();
            }
            catch (Exception e)
            {
                kind = "HARNESS";
                payload = e.ToString();
            }
            WriteResult(resultPath, kind, payload);
            return 0;
        }

        static void WriteResult(string path, string kind, string payload)
        {
            File.WriteAllText(path, kind + "\n" + payload, Utf8);
        }

        static object[] CoerceArguments(MethodInfo method, object[] raw)
        {
            ParameterInfo[] parameters = method.GetParameters();
            if (parameters.Length != raw.Length)
            {
                throw new ArgumentException(
                    "method under test takes " + parameters.Length + " argument(s) but the test supplies " + raw.Length);
            }
            object[] coerced = new object[raw.Length];
            for (int i = 0; i < raw.Length; i++)
            {
                coerced[i] = Coerce(raw[i], parameters[i].ParameterType);
            }
            return coerced;
        }

        static object Coerce(object value, Type target)
        {
            if (target.IsByRef)
            {
                target = target.GetElementType();
            }
            if (value == null)
            {
                return null;
            }
            Type underlying = Nullable.GetUnderlyingType(target);
            if (underlying != null)
            {
                target = underlying;
            }
            if (target == typeof(object))
            {
                return value;
            }

            object[] items = value as object[];
            if (items != null)
            {
                return CoerceSequence(items, target);
            }

            Dictionary<string, object> map = value as Dictionary<string, object>;
            if (map != null)
            {
                return CoerceMap(map, target);
            }

            if (target.IsInstanceOfType(value))
            {
                return value;
            }

            string text = value as string;
            if (text != null && target == typeof(char) && text.Length == 1)
            {
                return text[0];
            }
            if (target.IsEnum)
            {
                return text != null ? Enum.Parse(target, text) : Enum.ToObject(target, value);
            }
            if (value is IConvertible && typeof(IConvertible).IsAssignableFrom(target))
            {
                return Convert.ChangeType(value, target, CultureInfo.InvariantCulture);
            }
            throw new InvalidCastException("cannot convert " + value.GetType().Name + " to " + target.FullName);
        }

        static object CoerceSequence(object[] items, Type target)
        {
            if (target.IsArray)
            {
                Type element = target.GetElementType();
                Array array = Array.CreateInstance(element, items.Length);
                for (int i = 0; i < items.Length; i++)
                {
                    array.SetValue(Coerce(items[i], element), i);
                }
                return array;
            }
            if (target.IsGenericType)
            {
                Type definition = target.GetGenericTypeDefinition();
                if (definition == typeof(List<>) || definition == typeof(IList<>)
                    || definition == typeof(ICollection<>) || definition == typeof(IEnumerable<>)
                    || definition == typeof(IReadOnlyList<>) || definition == typeof(IReadOnlyCollection<>))
                {
                    Type element = target.GetGenericArguments()[0];
                    IList list = (IList)Activator.CreateInstance(typeof(List<>).MakeGenericType(element));
                    foreach (object item in items)
                    {
                        list.Add(Coerce(item, element));
                    }
                    return list;
                }
            }
            throw new InvalidCastException("cannot convert an array to " + target.FullName);
        }

        static object CoerceMap(Dictionary<string, object> map, Type target)
        {
            if (target.IsGenericType)
            {
                Type definition = target.GetGenericTypeDefinition();
                Type[] arguments = target.GetGenericArguments();
                if ((definition == typeof(Dictionary<,>) || definition == typeof(IDictionary<,>)
                    || definition == typeof(IReadOnlyDictionary<,>)) && arguments[0] == typeof(string))
                {
                    IDictionary result = (IDictionary)Activator.CreateInstance(
                        typeof(Dictionary<,>).MakeGenericType(arguments));
                    foreach (KeyValuePair<string, object> entry in map)
                    {
                        result.Add(entry.Key, Coerce(entry.Value, arguments[1]));
                    }
                    return result;
                }
            }
            throw new InvalidCastException("cannot convert an object to " + target.FullName);
        }

        static void WriteJson(StringBuilder sb, object value, int depth)
        {
            if (depth > MaxDepth)
            {
                throw new InvalidOperationException("return value nests deeper than " + MaxDepth + " levels");
            }
            if (value == null)
            {
                sb.Append("null");
                return;
            }
            if (value is bool)
            {
                sb.Append((bool)value ? "true" : "false");
                return;
            }
            if (value is string || value is char || value is Enum)
            {
                WriteString(sb, value.ToString());
                return;
            }
            if (value is float)
            {
                WriteFloating(sb, (float)value, ((float)value).ToString("R", CultureInfo.InvariantCulture));
                return;
            }
            if (value is double)
            {
                WriteFloating(sb, (double)value, ((double)value).ToString("R", CultureInfo.InvariantCulture));
                return;
            }
            if (value is decimal || value is int || value is long || value is short || value is byte
                || value is sbyte || value is ushort || value is uint || value is ulong)
            {
                sb.Append(Convert.ToString(value, CultureInfo.InvariantCulture));
                return;
            }

            IDictionary dictionary = value as IDictionary;
            if (dictionary != null)
            {
                sb.Append('{');
                bool first = true;
                foreach (DictionaryEntry entry in dictionary)
                {
                    if (!first)
                    {
                        sb.Append(',');
                    }
                    first = false;
                    WriteString(sb, Convert.ToString(entry.Key, CultureInfo.InvariantCulture));
                    sb.Append(':');
                    WriteJson(sb, entry.Value, depth + 1);
                }
                sb.Append('}');
                return;
            }

            IEnumerable sequence = value as IEnumerable;
            if (sequence != null)
            {
                sb.Append('[');
                bool first = true;
                foreach (object item in sequence)
                {
                    if (!first)
                    {
                        sb.Append(',');
                    }
                    first = false;
                    WriteJson(sb, item, depth + 1);
                }
                sb.Append(']');
                return;
            }

            WriteString(sb, value.ToString());
        }

        static void WriteFloating(StringBuilder sb, double value, string rendered)
        {
            if (double.IsNaN(value) || double.IsInfinity(value))
            {
                WriteString(sb, rendered);
            }
            else
            {
                sb.Append(rendered);
            }
        }

        static void WriteString(StringBuilder sb, string text)
        {
            sb.Append('"');
            foreach (char c in text)
            {
                switch (c)
                {
                    case '"': sb.Append("\\\""); break;
                    case '\\': sb.Append("\\\\"); break;
                    case '\n': sb.Append("\\n"); break;
                    case '\r': sb.Append("\\r"); break;
                    case '\t': sb.Append("\\t"); break;
                    default:
                        if (c < ' ')
                        {
                            sb.Append("\\u").Append(((int)c).ToString("x4", CultureInfo.InvariantCulture));
                        }
                        else
                        {
                            sb.Append(c);
                        }
                        break;
                }
            }
            sb.Append('"');
        }

        sealed class InputReader
        {
            readonly string[] lines;
            int cursor;

            public InputReader(string text)
            {
                lines = text.Split('\n');
            }

            public object[] ReadArguments()
            {
                object[] arguments = ReadValue() as object[];
                if (arguments == null)
                {
                    throw new FormatException("argument list must be an array");
                }
                return arguments;
            }

            string Next()
            {
                if (cursor >= lines.Length)
                {
                    throw new FormatException("unexpected end of input");
                }
                return lines[cursor++];
            }

            object ReadValue()
            {
                string line = Next();
                string tag = line.Length > 0 ? line.Substring(0, 1) : "";
                string rest = line.Length > 2 ? line.Substring(2) : "";
                switch (tag)
                {
                    case "n":
                        return null;
                    case "b":
                        return rest == "1";
                    case "i":
                        return int.Parse(rest, NumberStyles.Integer, CultureInfo.InvariantCulture);
                    case "l":
                        return long.Parse(rest, NumberStyles.Integer, CultureInfo.InvariantCulture);
                    case "u":
                        return ulong.Parse(rest, NumberStyles.Integer, CultureInfo.InvariantCulture);
                    case "d":
                        return double.Parse(rest, NumberStyles.Float, CultureInfo.InvariantCulture);
                    case "s":
                        return Unescape(rest);
                    case "a":
                    {
                        int count = int.Parse(rest, NumberStyles.Integer, CultureInfo.InvariantCulture);
                        object[] items = new object[count];
                        for (int i = 0; i < count; i++)
                        {
                            items[i] = ReadValue();
                        }
                        return items;
                    }
                    case "o":
                    {
                        int count = int.Parse(rest, NumberStyles.Integer, CultureInfo.InvariantCulture);
                        Dictionary<string, object> map = new Dictionary<string, object>();
                        for (int i = 0; i < count; i++)
                        {
                            string key = ReadValue() as string;
                            if (key == null)
                            {
                                throw new FormatException("object key must be a string");
                            }
                            map[key] = ReadValue();
                        }
                        return map;
                    }
                    default:
                        throw new FormatException("unknown input tag: " + line);
                }
            }

            static string Unescape(string text)
            {
                StringBuilder sb = new StringBuilder(text.Length);
                for (int i = 0; i < text.Length; i++)
                {
                    char c = text[i];
                    if (c == '\\' && i + 1 < text.Length)
                    {
                        char next = text[++i];
                        sb.Append(next == 'n' ? '\n' : next == 'r' ? '\r' : next);
                    }
                    else
                    {
                        sb.Append(c);
                    }
                }
                return sb.ToString();
            }
        }
    }
}
"#;

/// Render the harness source for `target`.
pub fn render(target: &TargetType) -> String {
    TEMPLATE.replace(
        TARGET_PLACEHOLDER,
        &csharp_string_literal(&target.qualified_name()),
    )
}

/// Quote `text` as a regular C# string literal.
pub fn csharp_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\u{:04x}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_embeds_qualified_target() {
        let source = render(&TargetType::new("FizzBuzzSample", "FizzBuzzClass"));
        assert!(
            source.contains(r#"const string TargetTypeName = "FizzBuzzSample.FizzBuzzClass";"#)
        );
        assert!(!source.contains(TARGET_PLACEHOLDER));
    }

    #[test]
    fn driver_type_matches_template() {
        let (namespace, class) = DRIVER_TYPE.rsplit_once('.').unwrap();
        assert!(TEMPLATE.contains(&format!("namespace {namespace}")));
        assert!(TEMPLATE.contains(&format!("public static class {class}")));
    }

    #[test]
    fn template_writes_every_outcome_kind() {
        for kind in ["METHOD", "MISSING", "RETURN", "THROWN", "HARNESS"] {
            assert!(TEMPLATE.contains(&format!("\"{kind}\"")), "missing {kind}");
        }
    }

    #[test]
    fn literal_escapes_quotes_and_controls() {
        assert_eq!(csharp_string_literal("A.B"), r#""A.B""#);
        assert_eq!(csharp_string_literal(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(csharp_string_literal("x\ny\u{1}"), r#""x\ny\u0001""#);
    }
}
