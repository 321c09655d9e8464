//! User identity negotiation sub-items (58H and 59H).
use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// The form of user identity presented by the association requester.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
#[non_exhaustive]
pub enum UserIdentityType {
    /// Username as a UTF-8 string
    Username,
    /// Username as a UTF-8 string and passcode
    UsernamePasscode,
    /// Kerberos service ticket
    Kerberos,
    /// SAML assertion
    Saml,
    /// JSON web token
    Jwt,
}

impl UserIdentityType {
    pub fn from(user_identity_type: u8) -> Option<Self> {
        match user_identity_type {
            1 => Some(Self::Username),
            2 => Some(Self::UsernamePasscode),
            3 => Some(Self::Kerberos),
            4 => Some(Self::Saml),
            5 => Some(Self::Jwt),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Username => 1,
            Self::UsernamePasscode => 2,
            Self::Kerberos => 3,
            Self::Saml => 4,
            Self::Jwt => 5,
        }
    }

    fn is_username(self) -> bool {
        matches!(self, Self::Username | Self::UsernamePasscode)
    }
}

impl fmt::Display for UserIdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Username => "username",
            Self::UsernamePasscode => "username and passcode",
            Self::Kerberos => "kerberos",
            Self::Saml => "saml",
            Self::Jwt => "jwt",
        };
        write!(f, "{} ({})", self.to_u8(), name)
    }
}

/// User identity sub-item of an association request.
///
/// The secondary field (the passcode)
/// is overwritten with zeros when it is replaced
/// and when the value or any clone of it is dropped,
/// and it never shows up in `Debug` or `Display` output.
#[derive(Clone, Eq, PartialEq)]
pub struct UserIdentityRQ {
    identity_type: UserIdentityType,
    positive_response_requested: bool,
    primary_field: Vec<u8>,
    secondary_field: Zeroizing<Vec<u8>>,
}

impl UserIdentityRQ {
    pub fn new(
        identity_type: UserIdentityType,
        positive_response_requested: bool,
        primary_field: Vec<u8>,
        secondary_field: Vec<u8>,
    ) -> Self {
        UserIdentityRQ {
            identity_type,
            positive_response_requested,
            primary_field,
            secondary_field: Zeroizing::new(secondary_field),
        }
    }

    pub fn username(username: &str) -> Self {
        Self::new(
            UserIdentityType::Username,
            false,
            username.as_bytes().to_vec(),
            Vec::new(),
        )
    }

    pub fn username_passcode(username: &str, passcode: &[char]) -> Self {
        Self::new(
            UserIdentityType::UsernamePasscode,
            false,
            username.as_bytes().to_vec(),
            Vec::new(),
        )
        .with_passcode(passcode)
    }

    pub fn kerberos(service_ticket: Vec<u8>) -> Self {
        Self::new(UserIdentityType::Kerberos, false, service_ticket, Vec::new())
    }

    pub fn saml(assertion: Vec<u8>) -> Self {
        Self::new(UserIdentityType::Saml, false, assertion, Vec::new())
    }

    pub fn jwt(token: Vec<u8>) -> Self {
        Self::new(UserIdentityType::Jwt, false, token, Vec::new())
    }

    fn with_passcode(mut self, passcode: &[char]) -> Self {
        self.secondary_field = encode_passcode(passcode);
        self
    }

    /// Builder method to request a server response from the acceptor.
    pub fn with_positive_response_requested(mut self, requested: bool) -> Self {
        self.positive_response_requested = requested;
        self
    }

    pub fn identity_type(&self) -> UserIdentityType {
        self.identity_type
    }

    pub fn positive_response_requested(&self) -> bool {
        self.positive_response_requested
    }

    pub fn set_positive_response_requested(&mut self, requested: bool) {
        self.positive_response_requested = requested;
    }

    pub fn primary_field(&self) -> &[u8] {
        &self.primary_field
    }

    pub fn secondary_field(&self) -> &[u8] {
        self.secondary_field.as_slice()
    }

    /// The username in the primary field,
    /// or `None` if the field is not valid UTF-8.
    pub fn username_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.primary_field).ok()
    }

    pub fn set_username(&mut self, username: &str) {
        self.primary_field = username.as_bytes().to_vec();
    }

    /// Decode the passcode in the secondary field.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub fn passcode(&self) -> Vec<char> {
        String::from_utf8_lossy(&self.secondary_field)
            .chars()
            .collect()
    }

    /// Replace the passcode.
    /// The previous passcode bytes are zeroed before being released.
    pub fn set_passcode(&mut self, passcode: &[char]) {
        self.secondary_field = encode_passcode(passcode);
    }

    /// The length of the sub-item's content, excluding the sub-item header.
    pub fn length(&self) -> usize {
        6 + self.primary_field.len() + self.secondary_field.len()
    }
}

/// Zeroes and clears the secondary field,
/// leaving the primary field in place.
impl Zeroize for UserIdentityRQ {
    fn zeroize(&mut self) {
        self.secondary_field.zeroize();
    }
}

impl fmt::Debug for UserIdentityRQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("UserIdentityRQ");
        s.field("identity_type", &self.identity_type)
            .field(
                "positive_response_requested",
                &self.positive_response_requested,
            );
        if self.identity_type.is_username() {
            s.field("username", &String::from_utf8_lossy(&self.primary_field));
        } else {
            s.field("primary_field", &ByteCount(self.primary_field.len()));
        }
        s.field("secondary_field", &Masked(self.secondary_field.len()))
            .finish()
    }
}

impl fmt::Display for UserIdentityRQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UserIdentity[")?;
        writeln!(f, "    type: {}", self.identity_type)?;
        writeln!(
            f,
            "    positive response requested: {}",
            self.positive_response_requested
        )?;
        if self.identity_type.is_username() {
            writeln!(
                f,
                "    username: {}",
                String::from_utf8_lossy(&self.primary_field)
            )?;
            if self.identity_type == UserIdentityType::UsernamePasscode {
                writeln!(f, "    passcode: {}", Masked(self.secondary_field.len()))?;
            }
        } else {
            writeln!(f, "    primary field: {}", ByteCount(self.primary_field.len()))?;
        }
        f.write_str("  ]")
    }
}

/// User identity server response (sub-item 59H).
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct UserIdentityAC {
    server_response: Vec<u8>,
}

impl UserIdentityAC {
    pub fn new(server_response: Vec<u8>) -> Self {
        UserIdentityAC { server_response }
    }

    pub fn server_response(&self) -> &[u8] {
        &self.server_response
    }

    /// The length of the sub-item's content, excluding the sub-item header.
    pub fn length(&self) -> usize {
        2 + self.server_response.len()
    }
}

impl fmt::Display for UserIdentityAC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UserIdentity[server response: {}]",
            ByteCount(self.server_response.len())
        )
    }
}

struct Masked(usize);

impl fmt::Display for Masked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_str("*")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Masked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

struct ByteCount(usize);

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.0)
    }
}

impl fmt::Debug for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn encode_passcode(passcode: &[char]) -> Zeroizing<Vec<u8>> {
    // exact capacity, the buffer is never reallocated
    let capacity = passcode.iter().map(|c| c.len_utf8()).sum();
    let mut out = Zeroizing::new(Vec::with_capacity(capacity));
    let mut buf = [0u8; 4];
    for c in passcode {
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
    buf.zeroize();
    out
}
