//! Credential masking for trace logs

const SECRET_KEYS: [&str; 2] = ["pass=", "s="];
const MASK: &str = "****";

/// Replace the values of `pass=` and `s=` parameters with `****`
///
/// A key only matches at a parameter boundary (start of text, after a space
/// or after `&`), so `clients=` or `tags=` are left alone. Keys match
/// case-insensitively; the value runs to the next `&` or whitespace.
pub fn mask_credentials(input: &str) -> String {
    let mut masked = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((start, key_len)) = find_secret_key(rest) {
        let value_start = start + key_len;
        let value_len = rest[value_start..]
            .find(|c: char| c == '&' || c.is_whitespace())
            .unwrap_or(rest.len() - value_start);

        masked.push_str(&rest[..value_start]);
        if value_len > 0 {
            masked.push_str(MASK);
        }
        rest = &rest[value_start + value_len..];
    }

    masked.push_str(rest);
    masked
}

fn find_secret_key(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find_map(|i| {
        let at_boundary = i == 0 || matches!(bytes[i - 1], b' ' | b'&' | b'\n');
        if !at_boundary {
            return None;
        }
        SECRET_KEYS.iter().find_map(|key| {
            text.get(i..i + key.len())
                .filter(|candidate| candidate.eq_ignore_ascii_case(key))
                .map(|_| (i, key.len()))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_masks_password_and_session() {
        let command = "AUTH user=baka&pass=hunter2&protover=3&client=shoko";
        assert_eq!(
            mask_credentials(command),
            "AUTH user=baka&pass=****&protover=3&client=shoko"
        );

        let command = "FILE size=1&ed2k=abc&s=XyZ12";
        assert_eq!(mask_credentials(command), "FILE size=1&ed2k=abc&s=****");

        let command = "LOGOUT s=XyZ12";
        assert_eq!(mask_credentials(command), "LOGOUT s=****");
    }

    #[test]
    fn test_leaves_lookalike_keys_alone() {
        let command = "MYLISTADD tags=a&clients=b&pos=1";
        assert_eq!(mask_credentials(command), command);
    }

    #[test]
    fn test_case_insensitive_keys() {
        assert_eq!(mask_credentials("AUTH PASS=x&S=y"), "AUTH PASS=****&S=****");
    }

    #[test]
    fn test_empty_value_stays_empty() {
        assert_eq!(mask_credentials("AUTH user=a&pass=&x=1"), "AUTH user=a&pass=&x=1");
    }

    #[test]
    fn test_reply_text_without_secrets() {
        let reply = "200 abc LOGIN ACCEPTED\ncdn.anidb.net";
        assert_eq!(mask_credentials(reply), reply);
    }

    proptest! {
        #[test]
        fn prop_password_never_survives_masking(password in "[A-Za-z0-9!#%*]{6,24}") {
            let command = format!("AUTH user=someone&pass={password}&protover=3");
            let masked = mask_credentials(&command);
            let leaked = format!("pass={password}");
            prop_assert!(!masked.contains(&leaked));
            prop_assert!(masked.contains("pass=****"));
        }
    }
}
