use uuid::Uuid;

use super::catalog::{Catalog, CourseScope};
use super::principal::{CampusRef, Principal};
use crate::errors::AppError;

/// Access evaluator over the academic hierarchy.
///
/// Decision order, for every operation:
/// 1. resolve the target (NotFound wins over Forbidden)
/// 2. campus/RTI gate against the owning program's campus set
/// 3. role-specific branch (teacher ownership, admin rule, or pass)
pub struct AccessEvaluator<C> {
    catalog: C,
}

impl<C: Catalog> AccessEvaluator<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Campus/RTI gate. A program offered at zero campuses is a data anomaly
    /// that denies everyone; retrying cannot fix it, so it is Forbidden
    /// rather than an internal error.
    fn campus_gate(&self, principal: &Principal, campuses: &[CampusRef]) -> Result<(), AppError> {
        if campuses.is_empty() {
            tracing::debug!(user_id = %principal.user_id, "program offered at no campus");
            return Err(AppError::forbidden("program is not offered at any campus"));
        }

        let campus_ids = principal.campus_ids();
        let rti_ids = principal.rti_ids();
        let granted = campuses
            .iter()
            .any(|c| campus_ids.contains(&c.id) || rti_ids.contains(&c.rti_id));

        if !granted {
            tracing::debug!(user_id = %principal.user_id, "campus gate denied");
            return Err(AppError::forbidden("no access to any campus of this program"));
        }

        Ok(())
    }

    async fn course_scope_or_not_found(&self, course_id: Uuid) -> Result<CourseScope, AppError> {
        self.catalog
            .course_scope(course_id)
            .await?
            .ok_or_else(|| AppError::not_found("course not found"))
    }

    /// Plain read/use access to a course. Teacher-only callers must be one of
    /// the course's assigned teachers; mixed-role callers pass on the campus
    /// gate alone.
    pub async fn validate_course_access(
        &self,
        principal: &Principal,
        course_id: Uuid,
    ) -> Result<(), AppError> {
        let scope = self.course_scope_or_not_found(course_id).await?;
        self.campus_gate(principal, &scope.campuses)?;

        if principal.has_only_teacher_role()
            && !self
                .catalog
                .is_course_teacher(course_id, principal.user_id)
                .await?
        {
            tracing::debug!(user_id = %principal.user_id, %course_id, "teacher ownership denied");
            return Err(AppError::forbidden("not an assigned teacher of this course"));
        }

        Ok(())
    }

    pub async fn validate_curricular_unit_access(
        &self,
        principal: &Principal,
        unit_id: Uuid,
    ) -> Result<(), AppError> {
        let scope = self
            .catalog
            .unit_scope(unit_id)
            .await?
            .ok_or_else(|| AppError::not_found("curricular unit not found"))?;
        self.campus_gate(principal, &scope.campuses)?;

        if principal.has_only_teacher_role()
            && !self.catalog.teacher_in_unit(unit_id, principal.user_id).await?
        {
            return Err(AppError::forbidden("no assigned course in this curricular unit"));
        }

        Ok(())
    }

    pub async fn validate_program_access(
        &self,
        principal: &Principal,
        program_id: Uuid,
    ) -> Result<(), AppError> {
        let campuses = self
            .catalog
            .program_campuses(program_id)
            .await?
            .ok_or_else(|| AppError::not_found("program not found"))?;
        self.campus_gate(principal, &campuses)?;

        if principal.has_only_teacher_role()
            && !self
                .catalog
                .teacher_in_program(program_id, principal.user_id)
                .await?
        {
            return Err(AppError::forbidden("no assigned course in this program"));
        }

        Ok(())
    }

    /// Delegates to the owning program, then narrows the teacher existence
    /// requirement to the term itself.
    pub async fn validate_term_access(
        &self,
        principal: &Principal,
        term_id: Uuid,
    ) -> Result<(), AppError> {
        let program_id = self
            .catalog
            .term_program(term_id)
            .await?
            .ok_or_else(|| AppError::not_found("term not found"))?;
        self.validate_program_access(principal, program_id).await?;

        if principal.has_only_teacher_role()
            && !self.catalog.teacher_in_term(term_id, principal.user_id).await?
        {
            return Err(AppError::forbidden("no assigned course in this term"));
        }

        Ok(())
    }

    pub async fn validate_weekly_planning_access(
        &self,
        principal: &Principal,
        planning_id: Uuid,
    ) -> Result<(), AppError> {
        let course_id = self
            .catalog
            .planning_course(planning_id)
            .await?
            .ok_or_else(|| AppError::not_found("weekly planning not found"))?;
        self.validate_course_access(principal, course_id).await
    }

    pub async fn validate_programmatic_content_access(
        &self,
        principal: &Principal,
        content_id: Uuid,
    ) -> Result<(), AppError> {
        let course_id = self
            .catalog
            .content_course(content_id)
            .await?
            .ok_or_else(|| AppError::not_found("programmatic content not found"))?;
        self.validate_course_access(principal, course_id).await
    }

    pub async fn validate_activity_access(
        &self,
        principal: &Principal,
        activity_id: Uuid,
    ) -> Result<(), AppError> {
        let course_id = self
            .catalog
            .activity_course(activity_id)
            .await?
            .ok_or_else(|| AppError::not_found("activity not found"))?;
        self.validate_course_access(principal, course_id).await
    }

    /// Direct membership check; there is no teacher-ownership tier at campus
    /// granularity.
    pub async fn validate_campus_access(
        &self,
        principal: &Principal,
        campus_id: Uuid,
    ) -> Result<(), AppError> {
        let rti_id = self
            .catalog
            .campus_rti(campus_id)
            .await?
            .ok_or_else(|| AppError::not_found("campus not found"))?;

        if principal.campus_ids().contains(&campus_id) || principal.rti_ids().contains(&rti_id) {
            return Ok(());
        }

        Err(AppError::forbidden("no access to this campus"))
    }

    pub async fn validate_rti_access(&self, principal: &Principal, rti_id: Uuid) -> Result<(), AppError> {
        if !self.catalog.rti_exists(rti_id).await? {
            return Err(AppError::not_found("rti not found"));
        }

        if principal.rti_ids().contains(&rti_id) {
            return Ok(());
        }

        Err(AppError::forbidden("no access to this rti"))
    }

    /// Write access to the planning hierarchy of a course. Strictly stricter
    /// than plain course access: the caller must hold a Teacher position and
    /// be an assigned teacher, regardless of any administrative roles held.
    pub async fn validate_course_planning_management(
        &self,
        principal: &Principal,
        course_id: Uuid,
    ) -> Result<(), AppError> {
        self.validate_course_access(principal, course_id).await?;

        if !principal.has_teacher_role() {
            tracing::debug!(user_id = %principal.user_id, %course_id, "planning management requires a teacher position");
            return Err(AppError::forbidden("planning management requires a teacher position"));
        }

        if !self
            .catalog
            .is_course_teacher(course_id, principal.user_id)
            .await?
        {
            return Err(AppError::forbidden("not an assigned teacher of this course"));
        }

        Ok(())
    }

    /// Course metadata update: Analyst/Coordinator at a program campus, or an
    /// assigned teacher of the course.
    pub async fn validate_course_update_access(
        &self,
        principal: &Principal,
        course_id: Uuid,
    ) -> Result<(), AppError> {
        let scope = self.course_scope_or_not_found(course_id).await?;
        if scope.campuses.is_empty() {
            return Err(AppError::forbidden("program is not offered at any campus"));
        }

        if principal.has_course_admin_at(&scope.campuses)
            || self
                .catalog
                .is_course_teacher(course_id, principal.user_id)
                .await?
        {
            return Ok(());
        }

        Err(AppError::forbidden("no permission to update this course"))
    }

    /// Course deletion: Analyst/Coordinator at a program campus only.
    /// Assigned teachers may never delete a course, even their own.
    pub async fn validate_course_delete_access(
        &self,
        principal: &Principal,
        course_id: Uuid,
    ) -> Result<(), AppError> {
        let scope = self.course_scope_or_not_found(course_id).await?;
        if scope.campuses.is_empty() {
            return Err(AppError::forbidden("program is not offered at any campus"));
        }

        if principal.has_course_admin_at(&scope.campuses) {
            return Ok(());
        }

        Err(AppError::forbidden("no permission to delete this course"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;

    use super::*;
    use crate::models::position::Role;

    /// In-memory stand-in for the SQL catalog. Only the shapes the evaluator
    /// walks are modeled: course -> program scope, teacher assignments, and
    /// the upward planning chain.
    #[derive(Default)]
    struct MemoryCatalog {
        courses: HashMap<Uuid, CourseScope>,
        units: HashMap<Uuid, CourseScope>,
        terms: HashMap<Uuid, Uuid>,
        programs: HashMap<Uuid, Vec<CampusRef>>,
        campuses: HashMap<Uuid, Uuid>,
        rtis: HashSet<Uuid>,
        course_teachers: HashSet<(Uuid, Uuid)>,
        program_teachers: HashSet<(Uuid, Uuid)>,
        term_teachers: HashSet<(Uuid, Uuid)>,
        unit_teachers: HashSet<(Uuid, Uuid)>,
        plannings: HashMap<Uuid, Uuid>,
        contents: HashMap<Uuid, Uuid>,
        activities: HashMap<Uuid, Uuid>,
    }

    #[async_trait]
    impl Catalog for MemoryCatalog {
        async fn course_scope(&self, course_id: Uuid) -> Result<Option<CourseScope>, AppError> {
            Ok(self.courses.get(&course_id).cloned())
        }

        async fn unit_scope(&self, unit_id: Uuid) -> Result<Option<CourseScope>, AppError> {
            Ok(self.units.get(&unit_id).cloned())
        }

        async fn term_program(&self, term_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self.terms.get(&term_id).copied())
        }

        async fn program_campuses(&self, program_id: Uuid) -> Result<Option<Vec<CampusRef>>, AppError> {
            Ok(self.programs.get(&program_id).cloned())
        }

        async fn campus_rti(&self, campus_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self.campuses.get(&campus_id).copied())
        }

        async fn rti_exists(&self, rti_id: Uuid) -> Result<bool, AppError> {
            Ok(self.rtis.contains(&rti_id))
        }

        async fn is_course_teacher(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
            Ok(self.course_teachers.contains(&(course_id, user_id)))
        }

        async fn teacher_in_program(&self, program_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
            Ok(self.program_teachers.contains(&(program_id, user_id)))
        }

        async fn teacher_in_term(&self, term_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
            Ok(self.term_teachers.contains(&(term_id, user_id)))
        }

        async fn teacher_in_unit(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
            Ok(self.unit_teachers.contains(&(unit_id, user_id)))
        }

        async fn planning_course(&self, planning_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self.plannings.get(&planning_id).copied())
        }

        async fn content_course(&self, content_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self.contents.get(&content_id).copied())
        }

        async fn activity_course(&self, activity_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self.activities.get(&activity_id).copied())
        }
    }

    fn campus(id: u128, rti: u128) -> CampusRef {
        CampusRef {
            id: Uuid::from_u128(id),
            rti_id: Uuid::from_u128(rti),
        }
    }

    const CAMPUS_A: u128 = 1;
    const CAMPUS_B: u128 = 2;
    const RTI_NORTH: u128 = 10;
    const RTI_SOUTH: u128 = 11;

    /// Course X at campus A (RTI north), plus a fixture program/term/unit.
    struct Fixture {
        catalog: MemoryCatalog,
        course: Uuid,
        program: Uuid,
        term: Uuid,
        unit: Uuid,
    }

    fn fixture() -> Fixture {
        let course = Uuid::new_v4();
        let program = Uuid::new_v4();
        let term = Uuid::new_v4();
        let unit = Uuid::new_v4();
        let scope = CourseScope {
            program_id: program,
            campuses: vec![campus(CAMPUS_A, RTI_NORTH)],
        };

        let mut catalog = MemoryCatalog::default();
        catalog.courses.insert(course, scope.clone());
        catalog.units.insert(unit, scope);
        catalog.terms.insert(term, program);
        catalog
            .programs
            .insert(program, vec![campus(CAMPUS_A, RTI_NORTH)]);
        catalog
            .campuses
            .insert(Uuid::from_u128(CAMPUS_A), Uuid::from_u128(RTI_NORTH));
        catalog.rtis.insert(Uuid::from_u128(RTI_NORTH));

        Fixture {
            catalog,
            course,
            program,
            term,
            unit,
        }
    }

    fn teacher_at_a(user: Uuid) -> Principal {
        Principal::new(user).with_position(Role::Teacher, [campus(CAMPUS_A, RTI_NORTH)])
    }

    fn is_forbidden(err: &AppError) -> bool {
        matches!(err, AppError::Forbidden(_))
    }

    fn is_not_found(err: &AppError) -> bool {
        matches!(err, AppError::NotFound(_))
    }

    #[tokio::test]
    async fn missing_ids_are_not_found_for_everyone() {
        let evaluator = AccessEvaluator::new(fixture().catalog);
        let principal = teacher_at_a(Uuid::new_v4());
        let missing = Uuid::new_v4();

        assert!(is_not_found(
            &evaluator.validate_course_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator.validate_program_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator.validate_term_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator
                .validate_curricular_unit_access(&principal, missing)
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator
                .validate_weekly_planning_access(&principal, missing)
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator
                .validate_programmatic_content_access(&principal, missing)
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator.validate_activity_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator.validate_campus_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator.validate_rti_access(&principal, missing).await.unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator
                .validate_course_update_access(&principal, missing)
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &evaluator
                .validate_course_delete_access(&principal, missing)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn rti_grant_subsumes_campus_grant() {
        let fx = fixture();
        let evaluator = AccessEvaluator::new(fx.catalog);
        let user = Uuid::new_v4();

        // Coordinator holds campus B only, but B's RTI covers campus A.
        let principal =
            Principal::new(user).with_position(Role::Coordinator, [campus(CAMPUS_B, RTI_NORTH)]);

        evaluator
            .validate_course_access(&principal, fx.course)
            .await
            .expect("rti grant should reach campus A");

        let southern =
            Principal::new(user).with_position(Role::Coordinator, [campus(CAMPUS_B, RTI_SOUTH)]);
        assert!(is_forbidden(
            &evaluator.validate_course_access(&southern, fx.course).await.unwrap_err()
        ));
    }

    #[tokio::test]
    async fn teacher_only_callers_need_assignment() {
        let mut fx = fixture();
        let assigned = Uuid::new_v4();
        let unassigned = Uuid::new_v4();
        fx.catalog.course_teachers.insert((fx.course, assigned));
        let evaluator = AccessEvaluator::new(fx.catalog);

        // Campus access alone is not enough for a teacher-only caller.
        assert!(is_forbidden(
            &evaluator
                .validate_course_access(&teacher_at_a(unassigned), fx.course)
                .await
                .unwrap_err()
        ));

        evaluator
            .validate_course_access(&teacher_at_a(assigned), fx.course)
            .await
            .expect("assigned teacher passes");
    }

    #[tokio::test]
    async fn mixed_roles_bypass_ownership() {
        let fx = fixture();
        let evaluator = AccessEvaluator::new(fx.catalog);
        let user = Uuid::new_v4();

        let principal = Principal::new(user)
            .with_position(Role::Teacher, [campus(CAMPUS_A, RTI_NORTH)])
            .with_position(Role::Coordinator, [campus(CAMPUS_A, RTI_NORTH)]);

        evaluator
            .validate_course_access(&principal, fx.course)
            .await
            .expect("mixed-role caller passes on campus grant alone");
    }

    #[tokio::test]
    async fn planning_management_requires_teacher_position_and_assignment() {
        let mut fx = fixture();
        let assigned = Uuid::new_v4();
        fx.catalog.course_teachers.insert((fx.course, assigned));
        let course = fx.course;
        let evaluator = AccessEvaluator::new(fx.catalog);

        // Full-campus admin without a teacher position: update yes, planning no.
        let analyst =
            Principal::new(Uuid::new_v4()).with_position(Role::Analyst, [campus(CAMPUS_A, RTI_NORTH)]);
        evaluator
            .validate_course_update_access(&analyst, course)
            .await
            .expect("analyst may update");
        evaluator
            .validate_course_delete_access(&analyst, course)
            .await
            .expect("analyst may delete");
        assert!(is_forbidden(
            &evaluator
                .validate_course_planning_management(&analyst, course)
                .await
                .unwrap_err()
        ));

        // Teacher+coordinator who is assigned passes; unassigned fails even
        // with the coordinator position.
        let assigned_mixed = Principal::new(assigned)
            .with_position(Role::Teacher, [campus(CAMPUS_A, RTI_NORTH)])
            .with_position(Role::Coordinator, [campus(CAMPUS_A, RTI_NORTH)]);
        evaluator
            .validate_course_planning_management(&assigned_mixed, course)
            .await
            .expect("assigned teacher with extra roles passes");

        let unassigned_mixed = Principal::new(Uuid::new_v4())
            .with_position(Role::Teacher, [campus(CAMPUS_A, RTI_NORTH)])
            .with_position(Role::Coordinator, [campus(CAMPUS_A, RTI_NORTH)]);
        assert!(is_forbidden(
            &evaluator
                .validate_course_planning_management(&unassigned_mixed, course)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn assigned_teachers_may_update_but_never_delete() {
        let mut fx = fixture();
        let teacher = Uuid::new_v4();
        fx.catalog.course_teachers.insert((fx.course, teacher));
        let course = fx.course;
        let evaluator = AccessEvaluator::new(fx.catalog);

        let principal = teacher_at_a(teacher);
        evaluator
            .validate_course_update_access(&principal, course)
            .await
            .expect("assigned teacher may update");
        assert!(is_forbidden(
            &evaluator
                .validate_course_delete_access(&principal, course)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn orphan_program_denies_every_caller() {
        let mut fx = fixture();
        let orphan = Uuid::new_v4();
        fx.catalog.programs.insert(orphan, Vec::new());
        let orphan_course = Uuid::new_v4();
        fx.catalog.courses.insert(
            orphan_course,
            CourseScope {
                program_id: orphan,
                campuses: Vec::new(),
            },
        );
        let evaluator = AccessEvaluator::new(fx.catalog);

        let admin = Principal::new(Uuid::new_v4())
            .with_position(Role::Administrator, [campus(CAMPUS_A, RTI_NORTH)]);

        assert!(is_forbidden(
            &evaluator.validate_program_access(&admin, orphan).await.unwrap_err()
        ));
        assert!(is_forbidden(
            &evaluator.validate_course_access(&admin, orphan_course).await.unwrap_err()
        ));
    }

    #[tokio::test]
    async fn term_access_requires_course_in_that_term() {
        let mut fx = fixture();
        let teacher = Uuid::new_v4();
        // Teacher has a course somewhere in the program, but not in this term.
        fx.catalog.program_teachers.insert((fx.program, teacher));
        let term = fx.term;
        let evaluator = AccessEvaluator::new(fx.catalog);

        assert!(is_forbidden(
            &evaluator
                .validate_term_access(&teacher_at_a(teacher), term)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn unit_access_uses_unit_existence_query() {
        let mut fx = fixture();
        let teacher = Uuid::new_v4();
        fx.catalog.unit_teachers.insert((fx.unit, teacher));
        let unit = fx.unit;
        let evaluator = AccessEvaluator::new(fx.catalog);

        evaluator
            .validate_curricular_unit_access(&teacher_at_a(teacher), unit)
            .await
            .expect("teacher with a course in the unit passes");

        assert!(is_forbidden(
            &evaluator
                .validate_curricular_unit_access(&teacher_at_a(Uuid::new_v4()), unit)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn planning_chain_resolves_to_owning_course() {
        let mut fx = fixture();
        let teacher = Uuid::new_v4();
        fx.catalog.course_teachers.insert((fx.course, teacher));

        let planning = Uuid::new_v4();
        let content = Uuid::new_v4();
        let activity = Uuid::new_v4();
        fx.catalog.plannings.insert(planning, fx.course);
        fx.catalog.contents.insert(content, fx.course);
        fx.catalog.activities.insert(activity, fx.course);
        let evaluator = AccessEvaluator::new(fx.catalog);

        let principal = teacher_at_a(teacher);
        evaluator
            .validate_weekly_planning_access(&principal, planning)
            .await
            .expect("planning resolves to accessible course");
        evaluator
            .validate_programmatic_content_access(&principal, content)
            .await
            .expect("content resolves to accessible course");
        evaluator
            .validate_activity_access(&principal, activity)
            .await
            .expect("activity resolves to accessible course");

        // The same chain denies an unassigned teacher-only caller.
        let outsider = teacher_at_a(Uuid::new_v4());
        assert!(is_forbidden(
            &evaluator
                .validate_weekly_planning_access(&outsider, planning)
                .await
                .unwrap_err()
        ));
    }

    #[tokio::test]
    async fn campus_and_rti_membership_checks() {
        let fx = fixture();
        let evaluator = AccessEvaluator::new(fx.catalog);
        let campus_a = Uuid::from_u128(CAMPUS_A);
        let rti_north = Uuid::from_u128(RTI_NORTH);

        let direct = teacher_at_a(Uuid::new_v4());
        evaluator
            .validate_campus_access(&direct, campus_a)
            .await
            .expect("direct campus member");
        evaluator
            .validate_rti_access(&direct, rti_north)
            .await
            .expect("rti derived from campus grant");

        // Campus B in RTI north still opens campus A through the RTI.
        let via_rti = Principal::new(Uuid::new_v4())
            .with_position(Role::Analyst, [campus(CAMPUS_B, RTI_NORTH)]);
        evaluator
            .validate_campus_access(&via_rti, campus_a)
            .await
            .expect("rti membership subsumes campus membership");

        let stranger = Principal::new(Uuid::new_v4())
            .with_position(Role::Analyst, [campus(CAMPUS_B, RTI_SOUTH)]);
        assert!(is_forbidden(
            &evaluator.validate_campus_access(&stranger, campus_a).await.unwrap_err()
        ));
        assert!(is_forbidden(
            &evaluator.validate_rti_access(&stranger, rti_north).await.unwrap_err()
        ));
    }

    #[tokio::test]
    async fn zero_position_caller_fails_campus_gate() {
        let fx = fixture();
        let course = fx.course;
        let evaluator = AccessEvaluator::new(fx.catalog);

        let empty = Principal::new(Uuid::new_v4());
        assert!(!empty.has_only_teacher_role());
        assert!(is_forbidden(
            &evaluator.validate_course_access(&empty, course).await.unwrap_err()
        ));
    }
}
