pub const MAX_USERNAME_LENGTH: usize = 120;
pub const MAX_PASSWORD_LENGTH: usize = 512;
pub const MAX_BLOG_TITLE_LENGTH: usize = 200;
pub const MAX_BLOG_CONTENT_LENGTH: usize = 1000;

#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(&'static str),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }

    /// Runs the next check only if this one passed.
    pub fn and<F: FnOnce() -> Validity>(self, next: F) -> Validity {
        match self {
            Validity::Valid => next(),
            invalid => invalid,
        }
    }
}

pub fn validate_username(username: &str) -> Validity {
    if username.trim().is_empty() {
        return Validity::Invalid("Username cannot be blank.");
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Validity::Invalid("Username cannot be longer than 120 characters.");
    }

    if username.chars().any(|c| c.is_control()) {
        return Validity::Invalid("Username cannot contain control characters.");
    }

    Validity::Valid
}

pub fn validate_password(password: &str) -> Validity {
    if password.is_empty() {
        return Validity::Invalid("Password cannot be empty.");
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Validity::Invalid("Password cannot be longer than 512 bytes.");
    }

    Validity::Valid
}

pub fn validate_blog_title(title: &str) -> Validity {
    if title.trim().is_empty() {
        return Validity::Invalid("Blog title cannot be blank.");
    }

    if title.chars().count() > MAX_BLOG_TITLE_LENGTH {
        return Validity::Invalid("Blog title cannot be longer than 200 characters.");
    }

    if title.chars().any(|c| c.is_control()) {
        return Validity::Invalid("Blog title cannot contain control characters.");
    }

    Validity::Valid
}

pub fn validate_blog_content(content: &str) -> Validity {
    if content.chars().count() > MAX_BLOG_CONTENT_LENGTH {
        return Validity::Invalid("Blog content cannot be longer than 1000 characters.");
    }

    // Line breaks and tabs are the only control characters content may carry
    if content
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Validity::Invalid("Blog content cannot contain control characters.");
    }

    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_valid());
        assert!(validate_username("Zoë the writer").is_valid());
        assert!(validate_username(&"a".repeat(120)).is_valid());
        assert!(validate_username(&"é".repeat(120)).is_valid());

        assert!(!validate_username("").is_valid());
        assert!(!validate_username(" \t").is_valid());
        assert!(!validate_username(&"a".repeat(121)).is_valid());
        assert!(!validate_username("bad\nname").is_valid());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("p").is_valid());
        assert!(validate_password(&"p".repeat(512)).is_valid());

        assert!(!validate_password("").is_valid());
        assert!(!validate_password(&"p".repeat(513)).is_valid());
    }

    #[test]
    fn test_validate_blog() {
        assert!(validate_blog_title("Hello").is_valid());
        assert!(validate_blog_title(&"t".repeat(200)).is_valid());
        assert!(!validate_blog_title("").is_valid());
        assert!(!validate_blog_title(&"t".repeat(201)).is_valid());

        assert!(validate_blog_content("").is_valid());
        assert!(validate_blog_content(&"c".repeat(1000)).is_valid());
        assert!(!validate_blog_content(&"c".repeat(1001)).is_valid());
    }

    #[test]
    fn test_validate_blog_control_characters() {
        assert!(!validate_blog_title("nul\0title").is_valid());
        assert!(!validate_blog_title("two\nlines").is_valid());
        assert!(!validate_blog_title("bell\u{7}").is_valid());

        assert!(validate_blog_content("line one\nline two\r\n\tindented").is_valid());
        assert!(!validate_blog_content("nul\0content").is_valid());
        assert!(!validate_blog_content("escape\u{1b}[0m").is_valid());
    }

    #[test]
    fn test_and_short_circuits() {
        let validity = Validity::Invalid("first").and(|| panic!("should not run"));
        assert!(matches!(validity, Validity::Invalid("first")));

        assert!(Validity::Valid.and(|| Validity::Valid).is_valid());
        assert!(!Validity::Valid.and(|| Validity::Invalid("second")).is_valid());
    }
}
