use super::{
    Column, EventTypeFilter, GenderTypeFilter, InstantFilter, IntegerFilter, LongFilter,
    StringFilter,
};

criteria!(
    PatientCriteria {
        id: LongFilter = "id" => Column::Plain("patient.id"),
        given_name: StringFilter = "givenName" => Column::Plain("patient.given_name"),
        family_name: StringFilter = "familyName" => Column::Plain("patient.family_name"),
        birth_date: InstantFilter = "birthDate" => Column::Plain("patient.birth_date"),
        gender: GenderTypeFilter = "gender" => Column::Plain("patient.gender"),
        nhs_number: LongFilter = "nhsNumber" => Column::Plain("patient.nhs_number"),
        email: StringFilter = "email" => Column::Plain("patient.email"),
        addresses_id: LongFilter = "addressesId" => Column::Exists {
            source: "address a",
            correlation: "a.patient_id = patient.id",
            value: "a.id",
        },
        procedure_bookings_id: LongFilter = "procedureBookingsId" => Column::Exists {
            source: "procedure_booking pb",
            correlation: "pb.patient_id = patient.id",
            value: "pb.id",
        },
    }
);

criteria!(
    AddressCriteria {
        id: LongFilter = "id" => Column::Plain("address.id"),
        street: StringFilter = "street" => Column::Plain("address.street"),
        line: StringFilter = "line" => Column::Exists {
            source: "json_each(address.lines) l",
            correlation: "1 = 1",
            value: "l.value",
        },
        city: StringFilter = "city" => Column::Plain("address.city"),
        county: StringFilter = "county" => Column::Plain("address.county"),
        postal_code: StringFilter = "postalCode" => Column::Plain("address.postal_code"),
        country: StringFilter = "country" => Column::Plain("address.country"),
        patient_id: LongFilter = "patientId" => Column::Plain("address.patient_id"),
    }
);

criteria!(
    ProcedureCriteria {
        id: LongFilter = "id" => Column::Plain("procedure.id"),
        local_code: IntegerFilter = "localCode" => Column::Plain("procedure.local_code"),
        name: StringFilter = "name" => Column::Plain("procedure.name"),
    }
);

criteria!(
    QuestionnaireCriteria {
        id: LongFilter = "id" => Column::Plain("questionnaire.id"),
        name: StringFilter = "name" => Column::Plain("questionnaire.name"),
        copyright: StringFilter = "copyright" => Column::Plain("questionnaire.copyright"),
    }
);

criteria!(
    ProcedureBookingCriteria {
        id: LongFilter = "id" => Column::Plain("procedure_booking.id"),
        consultant_name: StringFilter = "consultantName"
            => Column::Plain("procedure_booking.consultant_name"),
        hospital_site: StringFilter = "hospitalSite"
            => Column::Plain("procedure_booking.hospital_site"),
        scheduled_date: InstantFilter = "scheduledDate"
            => Column::Plain("procedure_booking.scheduled_date"),
        performed_date: InstantFilter = "performedDate"
            => Column::Plain("procedure_booking.performed_date"),
        primary_procedure: StringFilter = "primaryProcedure"
            => Column::Plain("procedure_booking.primary_procedure"),
        other_procedures: StringFilter = "otherProcedures"
            => Column::Plain("procedure_booking.other_procedures"),
        patient_id: LongFilter = "patientId" => Column::Plain("procedure_booking.patient_id"),
        followup_plan_id: LongFilter = "followupPlanId" => Column::Exists {
            source: "followup_plan plan",
            correlation: "plan.procedure_booking_id = procedure_booking.id",
            value: "plan.id",
        },
    }
);

criteria!(
    FollowupPlanCriteria {
        id: LongFilter = "id" => Column::Plain("followup_plan.id"),
        procedure_booking_id: LongFilter = "procedureBookingId"
            => Column::Plain("followup_plan.procedure_booking_id"),
        patient_id: LongFilter = "patientId" => Column::Plain("followup_plan.patient_id"),
        care_events_id: LongFilter = "careEventsId" => Column::Exists {
            source: "care_event ce",
            correlation: "ce.followup_plan_id = followup_plan.id",
            value: "ce.id",
        },
    }
);

criteria!(
    CareEventCriteria {
        id: LongFilter = "id" => Column::Plain("care_event.id"),
        event_type: EventTypeFilter = "type" => Column::Plain("care_event.event_type"),
        timepoint_id: LongFilter = "timepointId" => Column::Plain("care_event.timepoint_id"),
        patient_id: LongFilter = "patientId" => Column::Plain("care_event.patient_id"),
        followup_plan_id: LongFilter = "followupPlanId"
            => Column::Plain("care_event.followup_plan_id"),
    }
);
