//! Avatar resolution: a user record becomes either their uploaded image or
//! generated initials on a deterministic colour pair.

use serde::Serialize;

use crate::models::User;

/// (background, foreground) pairs. Order is part of the contract: changing it
/// recolours every generated avatar.
pub const PALETTE: [(&str, &str); 12] = [
    ("#FDE2E4", "#9D174D"),
    ("#E0F2FE", "#075985"),
    ("#DCFCE7", "#166534"),
    ("#FEF3C7", "#92400E"),
    ("#EDE9FE", "#5B21B6"),
    ("#FFE4E6", "#9F1239"),
    ("#CCFBF1", "#115E59"),
    ("#FCE7F3", "#9D174D"),
    ("#E0E7FF", "#3730A3"),
    ("#FFEDD5", "#9A3412"),
    ("#F1F5F9", "#334155"),
    ("#ECFCCB", "#3F6212"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvatarColors {
    pub background: &'static str,
    pub foreground: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvatarData {
    Image { url: String },
    Initials { initials: String, colors: AvatarColors },
}

/// The fields avatar resolution looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct AvatarInput<'a> {
    pub avatar: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: &'a str,
}

impl<'a> From<&'a User> for AvatarInput<'a> {
    fn from(u: &'a User) -> Self {
        AvatarInput {
            avatar: u.avatar.as_deref(),
            first_name: u.first_name.as_deref(),
            last_name: u.last_name.as_deref(),
            email: &u.email,
        }
    }
}

/// `h = c + ((h << 5) - h)` over UTF-16 code units, 32-bit wrapping
pub fn hash_seed(seed: &str) -> i32 {
    seed.encode_utf16().fold(0i32, |h, c| {
        (c as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h))
    })
}

pub fn colors_for(seed: &str) -> AvatarColors {
    let idx = (hash_seed(seed).unsigned_abs() as usize) % PALETTE.len();
    let (background, foreground) = PALETTE[idx];
    AvatarColors {
        background,
        foreground,
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn first_upper(s: &str) -> String {
    s.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default()
}

fn email_initials(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("").trim();
    let segments: Vec<&str> = local
        .split(['.', '-', '_'])
        .filter(|s| !s.is_empty())
        .collect();
    let initials = match segments.as_slice() {
        [a, b, ..] => format!("{}{}", first_upper(a), first_upper(b)),
        [only] => first_upper(only),
        [] => String::new(),
    };
    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

/// Resolve what to draw for a user. Total: every input yields an avatar.
///
/// Priority: uploaded image, then name initials, then email initials.
pub fn get_user_avatar_data(input: &AvatarInput<'_>) -> AvatarData {
    if let Some(url) = non_blank(input.avatar) {
        return AvatarData::Image {
            url: url.to_string(),
        };
    }

    let first = non_blank(input.first_name);
    let last = non_blank(input.last_name);
    if first.is_some() || last.is_some() {
        let initials: String = [first, last].into_iter().flatten().map(first_upper).collect();
        let seed = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
        return AvatarData::Initials {
            initials,
            colors: colors_for(&seed),
        };
    }

    AvatarData::Initials {
        initials: email_initials(input.email),
        colors: colors_for(input.email),
    }
}

/// Name shown next to the avatar: full name, whichever name exists, or the
/// email local-part.
pub fn display_name(user: &User) -> String {
    let first = non_blank(user.first_name.as_deref());
    let last = non_blank(user.last_name.as_deref());
    match (first, last) {
        (Some(f), Some(l)) => format!("{f} {l}"),
        (Some(n), None) | (None, Some(n)) => n.to_string(),
        (None, None) => user
            .email
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Korisnik")
            .to_string(),
    }
}
