use podium::render::{RenderService, SurfaceRole};
use podium::test_utils::test_helpers::ScriptedDocument;
use podium::Presentation;

fn presenter(pages: usize) -> (RenderService<ScriptedDocument>, Presentation) {
    let mut service = RenderService::new(ScriptedDocument::with_notes(pages, true));
    for (role, (w, h)) in SurfaceRole::ALL
        .into_iter()
        .zip([(192, 108), (80, 60), (64, 48)])
    {
        let id = service.register_role(role).unwrap();
        service.on_surface_resized(id, w, h).unwrap();
    }
    let presentation = Presentation::new(service.page_count());
    (service, presentation)
}

/// Fetch every visible surface, returning how many rasterizations it took
fn expose(service: &mut RenderService<ScriptedDocument>, presentation: &Presentation) -> usize {
    let before = service.document().call_count();
    for role in SurfaceRole::ALL {
        let id = service.registry().id_for_role(role).unwrap();
        if let Some(page) = presentation.page_for(role) {
            service.fetch_for_display(id, page).unwrap();
        }
    }
    service.document().call_count() - before
}

#[test]
fn forward_talk_is_served_from_prerendered_pages() {
    let (mut service, mut presentation) = presenter(8);

    let center = presentation.first();
    service.on_navigate(center);
    assert_eq!(expose(&mut service, &presentation), 3, "cold start renders");
    service.run_until_idle();

    for _ in 1..8 {
        let center = presentation.next();
        service.on_navigate(center);
        assert_eq!(expose(&mut service, &presentation), 0);
        // Speaker talks long enough for the sweep to finish
        service.run_until_idle();
    }

    assert_eq!(presentation.current(), 7);
    assert_eq!(service.stats().misses, 3);
}

#[test]
fn previewing_ahead_prerenders_around_preview() {
    let (mut service, mut presentation) = presenter(20);
    service.on_navigate(presentation.first());
    expose(&mut service, &presentation);
    service.run_until_idle();

    let center = presentation.preview_to(12);
    service.on_navigate(center);
    service.run_until_idle();

    let current = service.registry().id_for_role(SurfaceRole::PresenterCurrent).unwrap();
    for page in [10, 11, 12, 13, 14, 15, 16] {
        assert!(service.get(current, page).unwrap().is_some(), "page {page}");
    }
    // Audience still sees page 0
    assert_eq!(presentation.page_for(SurfaceRole::Content), Some(0));
    assert_eq!(expose(&mut service, &presentation), 0);
}

#[test]
fn last_page_hides_next_surface() {
    let (mut service, mut presentation) = presenter(3);
    presentation.last();
    assert_eq!(presentation.page_for(SurfaceRole::PresenterNext), None);
    // Content and presenter-current only
    assert_eq!(expose(&mut service, &presentation), 2);
}
