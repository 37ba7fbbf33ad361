use proptest::prelude::*;
use shared::{
    Address, AppError, Config, Coordinates, ErrorKind, GeocodingClient, Lookup, LookupState, Place,
    RequestId, Transition, API_KEY_ENV,
};
use url::Url;

fn place() -> Place {
    Place::new("Somewhere", Coordinates::new(1.0, 2.0).unwrap())
}

fn prior_state() -> impl Strategy<Value = Lookup> {
    prop_oneof![
        Just(Lookup::new()),
        Just({
            let mut lookup = Lookup::new();
            lookup.submit("in flight");
            lookup
        }),
        Just({
            let mut lookup = Lookup::new();
            let (request, _) = lookup.submit("resolved").unwrap();
            lookup.resolve(request, place());
            lookup
        }),
        Just({
            let mut lookup = Lookup::new();
            let (request, _) = lookup.submit("failed").unwrap();
            lookup.fail(request, AppError::new(ErrorKind::Geocoding, "Unknown error."));
            lookup
        }),
    ]
}

proptest! {
    #[test]
    fn any_non_blank_address_enters_pending(mut lookup in prior_state(), raw in "\\PC{1,64}") {
        prop_assume!(!raw.trim().is_empty());

        let (request, address) = lookup.submit(&raw).unwrap();

        prop_assert_eq!(address.as_str(), raw.trim());
        prop_assert_eq!(lookup.state(), &LookupState::Pending { address, request });
    }

    #[test]
    fn blank_input_never_changes_state(mut lookup in prior_state(), raw in "[ \t\r\n]{0,16}") {
        let before = lookup.clone();

        prop_assert!(lookup.submit(&raw).is_none());
        prop_assert_eq!(lookup, before);
    }

    #[test]
    fn superseded_results_are_ignored(addresses in prop::collection::vec("[a-z]{1,12}", 2..8)) {
        let mut lookup = Lookup::new();
        let requests: Vec<RequestId> = addresses
            .iter()
            .map(|a| lookup.submit(a).unwrap().0)
            .collect();
        let latest = *requests.last().unwrap();

        for &stale in &requests[..requests.len() - 1] {
            prop_assert!(matches!(lookup.resolve(stale, place()), Transition::Ignored(_)));
            prop_assert!(lookup.state().is_pending());
        }
        prop_assert_eq!(lookup.resolve(latest, place()), Transition::Applied);
    }

    #[test]
    fn address_survives_the_query_string(raw in "\\PC{1,64}") {
        prop_assume!(!raw.trim().is_empty());
        let config = Config::from_lookup(|var| (var == API_KEY_ENV).then(|| "k".to_string())).unwrap();
        let address = Address::parse(&raw).unwrap();

        let url = GeocodingClient::new(&config).request_url(&address);
        prop_assert!(!url.as_str().contains(' '));

        let reparsed = Url::parse(url.as_str()).unwrap();
        let sent = reparsed
            .query_pairs()
            .find(|(name, _)| name == "address")
            .map(|(_, value)| value.into_owned());
        prop_assert_eq!(sent.as_deref(), Some(address.as_str()));
    }
}
