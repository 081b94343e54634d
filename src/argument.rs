//! 请求参数的类型转换。
//!
//! 每个目标类型通过 `FromArgument` 声明自己如何从字符串值转换而来，转换失败返回 `None`，
//! 由 `RequestContext` 包装成带参数名的 `Exception::ConversionFailed`。

/// 可以从单个请求参数值转换得到的类型
pub trait FromArgument: Sized {
    /// 出现在错误信息里的类型名
    const TYPE_NAME: &'static str;

    fn from_argument(value: &str) -> Option<Self>;
}

impl FromArgument for String {
    const TYPE_NAME: &'static str = "string";

    fn from_argument(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromArgument for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_argument(value: &str) -> Option<Self> {
        match value {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

macro_rules! impl_from_argument_via_parse {
    ($($t:ty),*) => {
        $(
            impl FromArgument for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_argument(value: &str) -> Option<Self> {
                    value.parse::<$t>().ok()
                }
            }
        )*
    };
}

impl_from_argument_via_parse!(u8, u16, u32, u64, usize, i32, i64, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(String::from_argument(" a b "), Some(" a b ".to_string()));
    }

    #[test]
    fn test_integers() {
        assert_eq!(u32::from_argument("42"), Some(42));
        assert_eq!(i64::from_argument("-3"), Some(-3));
        assert_eq!(u32::from_argument("-3"), None);
        assert_eq!(u32::from_argument("12abc"), None);
        assert_eq!(u32::from_argument(""), None);
    }

    #[test]
    fn test_bool() {
        assert_eq!(bool::from_argument("true"), Some(true));
        assert_eq!(bool::from_argument("0"), Some(false));
        assert_eq!(bool::from_argument("maybe"), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(<u32 as FromArgument>::TYPE_NAME, "u32");
        assert_eq!(<String as FromArgument>::TYPE_NAME, "string");
    }
}
