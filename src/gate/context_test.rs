use super::*;

fn authorized(email: &str) -> IdentityContext {
    IdentityContext::provide(Arc::new(Identity::new(email)))
}

#[test]
fn default_context_is_the_empty_sentinel() {
    let ctx = IdentityContext::default();
    assert!(ctx.identity().is_empty());
    assert_eq!(ctx.email(), "");
}

#[test]
fn email_field_renders_verbatim() {
    let ctx = authorized("a@b.com");
    assert_eq!(AuthorizedField::new("email").render(&ctx), Some("a@b.com"));
}

#[test]
fn unknown_field_renders_nothing() {
    let ctx = authorized("a@b.com");
    for name in ["name", "Email", "EMAIL", "", "email "] {
        assert_eq!(AuthorizedField::new(name).render(&ctx), None, "{name:?} should render nothing");
    }
}

#[test]
fn fields_outside_an_authorized_gate_read_the_sentinel() {
    let ctx = IdentityContext::default();
    assert_eq!(AuthorizedField::new("email").render(&ctx), Some(""));
    assert_eq!(AuthorizedField::new("avatar").render(&ctx), None);
}

#[test]
fn field_key_parse_recognizes_only_email() {
    assert_eq!(FieldKey::parse("email"), Some(FieldKey::Email));
    assert_eq!(FieldKey::parse("id"), None);
    assert_eq!(AuthorizedField::new("email").key(), Some(FieldKey::Email));
    assert_eq!(AuthorizedField::new("id").key(), None);
}

#[test]
fn deeply_nested_readers_share_one_identity() {
    fn level3(ctx: &IdentityContext) -> String {
        AuthorizedField::new("email").render(ctx).unwrap_or_default().to_owned()
    }
    fn level2(ctx: &IdentityContext) -> String {
        let owned = ctx.clone();
        level3(&owned)
    }
    fn level1(ctx: &IdentityContext) -> String {
        level2(ctx)
    }

    let ctx = authorized("deep@b.com");
    assert_eq!(level1(&ctx), "deep@b.com");
    let clone = ctx.clone();
    assert!(std::ptr::eq(ctx.identity(), clone.identity()));
}
