use super::Searchable;
use crate::models::{
    Address, CareEvent, FollowupPlan, Patient, Procedure, ProcedureBooking, Questionnaire, User,
};

fn push_opt(fields: &mut Vec<(&'static str, String)>, name: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        fields.push((name, value.clone()));
    }
}

fn push_id(fields: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<i64>) {
    if let Some(value) = value {
        fields.push((name, value.to_string()));
    }
}

impl Searchable for Patient {
    const INDEX: &'static str = "patient";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("givenName", self.given_name.clone()),
            ("familyName", self.family_name.clone()),
            ("birthDate", self.birth_date.format("%Y-%m-%d").to_string()),
            ("gender", self.gender.to_string()),
            ("nhsNumber", self.nhs_number.to_string()),
        ];
        push_opt(&mut fields, "email", &self.email);
        for address in &self.addresses {
            push_opt(&mut fields, "city", &address.city);
            push_opt(&mut fields, "postalCode", &address.postal_code);
        }
        fields
    }
}

impl Searchable for Address {
    const INDEX: &'static str = "address";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        push_opt(&mut fields, "street", &self.street);
        for line in &self.lines {
            fields.push(("line", line.clone()));
        }
        push_opt(&mut fields, "city", &self.city);
        push_opt(&mut fields, "county", &self.county);
        push_opt(&mut fields, "postalCode", &self.postal_code);
        push_opt(&mut fields, "country", &self.country);
        fields
    }
}

impl Searchable for Procedure {
    const INDEX: &'static str = "procedure";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("localCode", self.local_code.to_string()),
            ("name", self.name.clone()),
        ]
    }
}

impl Searchable for Questionnaire {
    const INDEX: &'static str = "questionnaire";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("name", self.name.clone())];
        push_opt(&mut fields, "copyright", &self.copyright);
        fields
    }
}

impl Searchable for ProcedureBooking {
    const INDEX: &'static str = "procedurebooking";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("consultantName", self.consultant_name.clone()),
            ("hospitalSite", self.hospital_site.clone()),
            ("primaryProcedure", self.primary_procedure.clone()),
        ];
        push_opt(&mut fields, "otherProcedures", &self.other_procedures);
        if let Some(date) = self.scheduled_date {
            fields.push(("scheduledDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.performed_date {
            fields.push(("performedDate", date.format("%Y-%m-%d").to_string()));
        }
        push_id(&mut fields, "patientId", self.patient_id);
        fields
    }
}

impl Searchable for FollowupPlan {
    const INDEX: &'static str = "followupplan";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("procedureBookingId", self.procedure_booking_id.to_string()),
            ("patientId", self.patient_id.to_string()),
        ]
    }
}

impl Searchable for CareEvent {
    const INDEX: &'static str = "careevent";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("type", self.event_type.to_string())];
        push_id(&mut fields, "timepointId", self.timepoint_id);
        push_id(&mut fields, "patientId", self.patient_id);
        push_id(&mut fields, "followupPlanId", self.followup_plan_id);
        fields
    }
}

impl Searchable for User {
    const INDEX: &'static str = "user";

    fn search_id(&self) -> Option<i64> {
        self.id
    }

    fn search_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("login", self.login.clone())];
        push_opt(&mut fields, "title", &self.title);
        push_opt(&mut fields, "firstName", &self.first_name);
        push_opt(&mut fields, "lastName", &self.last_name);
        push_opt(&mut fields, "email", &self.email);
        for authority in &self.authorities {
            fields.push(("authorities", authority.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, GenderType, ROLE_CONSULTANT};
    use crate::pagination::Pageable;
    use crate::search::SearchIndex;

    #[test]
    fn test_patient_is_searchable_by_address_city() {
        let mut address = Address::with_street("1 High Street");
        address.city = Some("Newcastle upon Tyne".to_string());
        let patient = Patient {
            id: Some(5),
            given_name: "Jane".to_string(),
            family_name: "Doe".to_string(),
            birth_date: "1980-07-14T00:00:00Z".parse().unwrap(),
            gender: GenderType::Female,
            nhs_number: 9434765919,
            email: None,
            addresses: vec![address],
        };

        let index = SearchIndex::new();
        index.index(&patient);

        let page = index.search::<Patient>("city:newcastle", &Pageable::default());
        assert_eq!(page.content, vec![5]);
        let page = index.search::<Patient>("nhsNumber:9434765919", &Pageable::default());
        assert_eq!(page.content, vec![5]);
        let page = index.search::<Patient>("1980", &Pageable::default());
        assert_eq!(page.content, vec![5]);
    }

    #[test]
    fn test_care_event_fields() {
        let event = CareEvent {
            id: Some(1),
            event_type: EventType::Preoperative,
            timepoint_id: Some(1),
            patient_id: Some(2),
            followup_plan_id: None,
        };
        let fields = event.search_fields();
        assert_eq!(fields[0], ("type", "PREOPERATIVE".to_string()));
        assert!(!fields.iter().any(|(name, _)| *name == "followupPlanId"));
    }

    #[test]
    fn test_user_without_id_is_not_indexed() {
        let mut user = User::new("consultant");
        user.add_authority(ROLE_CONSULTANT);

        let index = SearchIndex::new();
        index.index(&user);
        assert_eq!(index.document_count::<User>(), 0);

        user.id = Some(1);
        index.index(&user);
        let page = index.search::<User>("authorities:role_consultant", &Pageable::default());
        assert_eq!(page.content, vec![1]);
    }
}
