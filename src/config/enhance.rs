/// 展开配置文本中的环境变量
///
/// 支持 `$VAR`、`${VAR}` 与 `${VAR:-default}`；未定义的变量展开为空串，
/// 单独的 `$` 原样保留。
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let expr: String = chars.by_ref().take_while(|&c| c != '}').collect();
            result.push_str(&braced(&expr));
            continue;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            chars.next();
        }

        if name.is_empty() {
            result.push('$');
        } else {
            result.push_str(&std::env::var(&name).unwrap_or_default());
        }
    }
    result
}

fn braced(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name) {
            Ok(value) if !value.is_empty() => value,
            _ => default.to_string(),
        },
        None => std::env::var(expr).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braces() {
        std::env::set_var("DNSMUX_TEST_DOH", "https://dns.example/dns-query");
        assert_eq!(
            expand_env_vars("com: ${DNSMUX_TEST_DOH}"),
            "com: https://dns.example/dns-query"
        );
        std::env::remove_var("DNSMUX_TEST_DOH");
    }

    #[test]
    fn bare_name() {
        std::env::set_var("DNSMUX_TEST_SIZE", "64");
        assert_eq!(expand_env_vars("cache-size: $DNSMUX_TEST_SIZE\n"), "cache-size: 64\n");
        std::env::remove_var("DNSMUX_TEST_SIZE");
    }

    #[test]
    fn default_used_when_unset_or_empty() {
        std::env::remove_var("DNSMUX_TEST_MISSING");
        assert_eq!(expand_env_vars("${DNSMUX_TEST_MISSING:-system}"), "system");

        std::env::set_var("DNSMUX_TEST_EMPTY", "");
        assert_eq!(expand_env_vars("${DNSMUX_TEST_EMPTY:-system}"), "system");
        std::env::remove_var("DNSMUX_TEST_EMPTY");
    }

    #[test]
    fn default_overridden_when_set() {
        std::env::set_var("DNSMUX_TEST_SET", "json+https://dns.google/resolve");
        assert_eq!(
            expand_env_vars("${DNSMUX_TEST_SET:-system}"),
            "json+https://dns.google/resolve"
        );
        std::env::remove_var("DNSMUX_TEST_SET");
    }

    #[test]
    fn undefined_is_empty() {
        std::env::remove_var("DNSMUX_TEST_UNDEFINED");
        assert_eq!(expand_env_vars("x=${DNSMUX_TEST_UNDEFINED}."), "x=.");
    }

    #[test]
    fn lone_dollar_kept() {
        assert_eq!(expand_env_vars("cost $ 5"), "cost $ 5");
        assert_eq!(expand_env_vars("plain text"), "plain text");
    }
}
