/// The shapes a catalogue form field can take.
///
/// This enum is deliberately *closed*: backend column descriptors are mapped onto one of these
/// variants once, instead of dispatching on free-form type strings at every use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Single-line free text.
    Text,
    /// Multi-line free text (interpretations, descriptions).
    LongText,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// One value chosen from a list of options.
    SingleSelect,
    /// Backend-assigned record identifier; never user-entered.
    Identifier,
}

impl FieldKind {
    /// Whether a user is expected to type or pick a value for this field.
    pub fn is_user_editable(&self) -> bool {
        !matches!(self, FieldKind::Identifier)
    }

    /// Returns a short human-readable label for this field kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "long text",
            FieldKind::Date => "date",
            FieldKind::SingleSelect => "select",
            FieldKind::Identifier => "identifier",
        }
    }
}
